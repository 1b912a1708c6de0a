use std::collections::{BTreeMap, HashMap};

use serde_json::{json, Value};

use crate::models::{IndicatorPoint, KLine};

pub const CANDLE_SERIES: &str = "K-Line";
pub const VOLUME_SERIES: &str = "Volume";

// Rising bars red, falling bars green.
const UP_COLOR: &str = "#ef5350";
const DOWN_COLOR: &str = "#26a69a";
const RSI_COLOR: &str = "#FFC107";

fn ma_color(key: &str) -> Option<&'static str> {
    match key {
        "MA5" => Some("#FF9800"),
        "MA10" => Some("#2196F3"),
        "MA20" => Some("#9C27B0"),
        _ => None,
    }
}

/// `MA5`, `MA10`, ... but not `MACD`. A plain `MA` prefix match would
/// draw MACD on the price grid, so the suffix must be a period.
fn is_moving_average(key: &str) -> bool {
    key.strip_prefix("MA")
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
}

fn grid(top: Option<&str>, height: &str) -> Value {
    let mut g = json!({ "left": "10%", "right": "10%", "height": height });
    if let Some(top) = top {
        g["top"] = json!(top);
    }
    g
}

/// Day part of a backend date or timestamp.
fn day(date: &str) -> &str {
    date.split(['T', ' ']).next().unwrap_or(date)
}

/// One value per bar, matched on the bar's trade date; `null` where the
/// series has no point for that day. Series whose points carry no dates
/// are taken positionally.
fn values(bars: &[KLine], points: &[IndicatorPoint]) -> Vec<Option<f64>> {
    let by_date: HashMap<&str, Option<f64>> = points
        .iter()
        .filter_map(|p| p.trade_date.as_deref().map(|d| (day(d), p.value)))
        .collect();
    if by_date.is_empty() {
        return points.iter().map(|p| p.value).collect();
    }
    bars.iter()
        .map(|b| by_date.get(day(&b.trade_date)).copied().flatten())
        .collect()
}

/// Build the chart option for a price series and its overlays.
///
/// `bars` must be oldest first. Overlay points are placed by trade date, so
/// they may arrive in any order.
///
/// Layout: candles with moving-average lines on grid 0, volume bars on
/// grid 1, and RSI on a third grid when that overlay is present. Other
/// overlay keys (MACD, KDJ, BOLL) are not drawn. Returns `None` when there
/// are no bars.
pub fn build_kline_chart(bars: &[KLine], overlays: &BTreeMap<String, Vec<IndicatorPoint>>) -> Option<Value> {
    if bars.is_empty() {
        return None;
    }

    let dates: Vec<String> = bars.iter().map(KLine::label).collect();
    // ECharts candlestick order is [open, close, low, high].
    let candles: Vec<[f64; 4]> = bars
        .iter()
        .map(|b| [b.open_price, b.close_price, b.low_price, b.high_price])
        .collect();
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();

    let mut series = vec![json!({
        "name": CANDLE_SERIES,
        "type": "candlestick",
        "data": candles,
        "itemStyle": {
            "color": UP_COLOR,
            "color0": DOWN_COLOR,
            "borderColor": UP_COLOR,
            "borderColor0": DOWN_COLOR,
        },
        "xAxisIndex": 0,
        "yAxisIndex": 0,
    })];

    for (key, points) in overlays {
        if !is_moving_average(key) || points.is_empty() {
            continue;
        }
        let mut line_style = json!({ "width": 2 });
        if let Some(color) = ma_color(key) {
            line_style["color"] = json!(color);
        }
        series.push(json!({
            "name": key,
            "type": "line",
            "data": values(bars, points),
            "smooth": true,
            "lineStyle": line_style,
            "xAxisIndex": 0,
            "yAxisIndex": 0,
        }));
    }

    series.push(json!({
        "name": VOLUME_SERIES,
        "type": "bar",
        "data": volumes,
        "xAxisIndex": 1,
        "yAxisIndex": 1,
    }));

    let mut grids = vec![grid(None, "50%"), grid(Some("65%"), "10%")];
    let mut x_axes = vec![
        json!({ "type": "category", "data": dates, "gridIndex": 0 }),
        json!({ "type": "category", "data": dates, "gridIndex": 1 }),
    ];
    let mut y_axes = vec![json!({ "scale": true, "gridIndex": 0 }), json!({ "scale": true, "gridIndex": 1 })];

    if let Some(rsi) = overlays.get("RSI").filter(|p| !p.is_empty()) {
        let index = grids.len();
        grids.push(grid(Some("78%"), "10%"));
        x_axes.push(json!({ "type": "category", "data": dates, "gridIndex": index }));
        y_axes.push(json!({ "scale": true, "gridIndex": index }));
        series.push(json!({
            "name": "RSI",
            "type": "line",
            "data": values(bars, rsi),
            "lineStyle": { "color": RSI_COLOR },
            "xAxisIndex": index,
            "yAxisIndex": index,
        }));
    }

    let legend: Vec<Value> = series.iter().map(|s| s["name"].clone()).collect();

    Some(json!({
        "tooltip": { "trigger": "axis", "axisPointer": { "type": "cross" } },
        "legend": { "data": legend, "top": 0 },
        "grid": grids,
        "xAxis": x_axes,
        "yAxis": y_axes,
        "series": series,
    }))
}
