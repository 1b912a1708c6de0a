//! Table and JSON rendering for command results.

use anyhow::Result;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use serde::Serialize;

use pareview_core::models::{DashboardStats, IndicatorRecord, Instrument, KLine, ReviewRecord, TradeLog};
use pareview_core::utils::{format_date, format_percent, format_price, format_signed, truncate_string};

/// Column width for free-text cells.
const NOTES_WIDTH: usize = 40;

fn table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header.to_vec());
    table
}

fn or_dash(value: Option<String>) -> String {
    value.unwrap_or_else(|| "-".to_string())
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn instruments_table(instruments: &[Instrument]) -> Table {
    let mut t = table(&["ID", "Symbol", "Name", "Exchange", "Market", "Active"]);
    for i in instruments {
        t.add_row(vec![
            i.id.to_string(),
            i.symbol.clone(),
            i.name.clone(),
            i.exchange.clone(),
            i.market_type.to_string(),
            if i.is_active { "yes" } else { "no" }.to_string(),
        ]);
    }
    t
}

pub fn klines_table(bars: &[KLine]) -> Table {
    let mut t = table(&["Date", "Open", "High", "Low", "Close", "Change", "Volume"]);
    for b in bars {
        t.add_row(vec![
            b.label(),
            format_price(b.open_price),
            format_price(b.high_price),
            format_price(b.low_price),
            format_price(b.close_price),
            or_dash(b.change_percent().map(format_percent)),
            format!("{:.0}", b.volume),
        ]);
    }
    t
}

pub fn indicators_table(records: &[IndicatorRecord]) -> Table {
    let mut t = table(&["ID", "Instrument", "Type", "Date", "Calculated"]);
    for r in records {
        t.add_row(vec![
            r.id.to_string(),
            r.instrument_name
                .clone()
                .or_else(|| r.instrument.map(|id| format!("#{}", id)))
                .unwrap_or_else(|| "-".to_string()),
            r.indicator_type.clone(),
            or_dash(r.trade_date.clone()),
            or_dash(r.calculated_at.as_deref().map(format_date)),
        ]);
    }
    t
}

pub fn reviews_table(reviews: &[ReviewRecord]) -> Table {
    let mut t = table(&["ID", "Date", "Instrument", "Stage", "Outcome", "Rating", "Tags"]);
    for r in reviews {
        t.add_row(vec![
            r.id.to_string(),
            r.review_date.clone(),
            r.instrument_label(),
            or_dash(r.market_stage.map(|s| s.to_string())),
            or_dash(r.outcome.map(|o| o.to_string())),
            or_dash(r.rating.map(|n| n.to_string())),
            r.tags.join(", "),
        ]);
    }
    t
}

pub fn review_detail(r: &ReviewRecord) -> Table {
    let mut t = table(&["Field", "Value"]);
    let rows: Vec<(&str, String)> = vec![
        ("ID", r.id.to_string()),
        ("Instrument", r.instrument_label()),
        ("Date", r.review_date.clone()),
        ("Type", or_dash(r.review_type.map(|v| v.to_string()))),
        ("Stage", or_dash(r.market_stage.map(|v| v.to_string()))),
        ("Support", or_dash(r.support_levels.clone())),
        ("Resistance", or_dash(r.resistance_levels.clone())),
        ("Entry", or_dash(r.entry_price.map(format_price))),
        ("Stop", or_dash(r.stop_loss.map(format_price))),
        ("Target", or_dash(r.take_profit.map(format_price))),
        ("R:R", or_dash(r.risk_reward().map(|rr| format!("{:.2}", rr)))),
        ("Outcome", or_dash(r.outcome.map(|o| o.to_string()))),
        ("Rating", or_dash(r.rating.map(|n| n.to_string()))),
        ("Tags", r.tags.join(", ")),
        ("Notes", r.analysis_notes.clone().unwrap_or_default()),
    ];
    for (field, value) in rows {
        t.add_row(vec![field.to_string(), value]);
    }
    t
}

pub fn trades_table(trades: &[TradeLog]) -> Table {
    let mut t = table(&["ID", "Side", "Entry", "Exit", "Qty", "P/L", "Outcome", "Notes"]);
    for tr in trades {
        t.add_row(vec![
            tr.id.to_string(),
            tr.position_type.to_string(),
            format_price(tr.entry_price),
            or_dash(tr.exit_price.map(format_price)),
            format!("{}", tr.quantity),
            or_dash(tr.realized_pnl().map(format_signed)),
            tr.outcome().to_string(),
            truncate_string(tr.notes.as_deref().unwrap_or(""), NOTES_WIDTH),
        ]);
    }
    t
}

pub fn dashboard_table(stats: &DashboardStats) -> Table {
    let mut t = table(&["Metric", "Value"]);
    t.add_row(vec!["Instruments".to_string(), stats.total_instruments.to_string()]);
    t.add_row(vec!["Reviews".to_string(), stats.total_reviews.to_string()]);
    t.add_row(vec!["Trades".to_string(), stats.total_trades.to_string()]);
    t.add_row(vec!["Win rate".to_string(), or_dash(stats.win_rate.map(format_percent))]);
    t.add_row(vec![
        "Total P/L".to_string(),
        or_dash(stats.total_profit_loss.map(format_signed)),
    ]);
    t
}
