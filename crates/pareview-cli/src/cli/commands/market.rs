//! K-line, chart and indicator command handlers.

use anyhow::Result;
use chrono::NaiveDate;
use pareview_core::chart::build_kline_chart;
use pareview_core::models::{parse_overlay, sort_chronologically, BatchCalculateRequest, IndicatorType, KLine, Period};

use crate::cli::context::AppContext;
use crate::output::{indicators_table, klines_table, print_json};

/// Bars for an instrument, oldest first. Online reads refresh the cache.
async fn load_bars(ctx: &AppContext, instrument_id: i64, page_size: Option<u32>) -> Result<Vec<KLine>> {
    let mut bars = if ctx.offline {
        ctx.cached(ctx.cache.load_klines(instrument_id), "K-lines")?
    } else {
        ctx.require_login()?;
        let page_size = page_size.unwrap_or(ctx.config.kline_page_size);
        let bars = ctx.client.list_klines(instrument_id, page_size).await?;
        ctx.store(ctx.cache.save_klines(instrument_id, &bars), "klines");
        bars
    };
    sort_chronologically(&mut bars);
    Ok(bars)
}

pub async fn klines(ctx: &AppContext, reference: &str, page_size: Option<u32>) -> Result<()> {
    let id = ctx.resolve_instrument(reference).await?;
    let bars = load_bars(ctx, id, page_size).await?;

    if ctx.json {
        return print_json(&bars);
    }
    if bars.is_empty() {
        println!("No K-line data for {}. Try `pareview instruments sync {}`.", reference, reference);
    } else {
        println!("{}", klines_table(&bars));
    }
    Ok(())
}

/// Indicator series are never cached, so an offline chart has none.
fn offline_overlays_notice(keys: &[String]) -> String {
    format!("Skipping {} while offline; indicators are not cached.", keys.join(", "))
}

/// Print the chart option document. Always JSON: it is meant for a renderer.
pub async fn chart(ctx: &AppContext, reference: &str, indicators: &[String], page_size: Option<u32>) -> Result<()> {
    let keys = indicators
        .iter()
        .map(|k| parse_overlay(k))
        .collect::<Result<Vec<_>, _>>()?;

    let id = ctx.resolve_instrument(reference).await?;
    let bars = load_bars(ctx, id, page_size).await?;
    let overlays = if keys.is_empty() {
        Default::default()
    } else if ctx.offline {
        eprintln!("{}", offline_overlays_notice(&keys));
        Default::default()
    } else {
        ctx.client.fetch_indicator_overlays(id, &keys).await?
    };

    match build_kline_chart(&bars, &overlays) {
        Some(option) => print_json(&option),
        None => anyhow::bail!("No K-line data for {}", reference),
    }
}

pub async fn list_indicators(ctx: &AppContext) -> Result<()> {
    ctx.require_login()?;
    let records = ctx.client.list_indicators().await?;

    if ctx.json {
        return print_json(&records);
    }
    if records.is_empty() {
        println!("No indicator results yet.");
    } else {
        println!("{}", indicators_table(&records));
    }
    Ok(())
}

pub async fn calculate(
    ctx: &AppContext,
    references: &[String],
    indicator_types: Vec<IndicatorType>,
    start: NaiveDate,
    end: NaiveDate,
    timeframe: Period,
) -> Result<()> {
    ctx.require_login()?;
    let request = BatchCalculateRequest {
        instrument_ids: ctx.resolve_instruments(references).await?,
        indicator_types,
        start_date: Some(start),
        end_date: Some(end),
        timeframe,
    };
    let summary = ctx.client.batch_calculate_indicators(&request).await?;

    if ctx.json {
        return print_json(&summary);
    }
    match summary.get("message").and_then(|m| m.as_str()) {
        Some(message) => println!("{}", message),
        None => println!(
            "Calculation requested for {} instrument(s) from {} to {}.",
            request.instrument_ids.len(),
            start,
            end
        ),
    }
    Ok(())
}
