//! Instrument command handlers.

use anyhow::{Context, Result};
use pareview_core::models::{KlineSyncRequest, MarketType, NewInstrument};

use crate::cli::context::AppContext;
use crate::output::{instruments_table, print_json};

/// Fields to change on `instruments edit`; `None` keeps the current value.
#[derive(Debug, Default)]
pub struct InstrumentChanges {
    pub name: Option<String>,
    pub exchange: Option<String>,
    pub market: Option<MarketType>,
    pub active: Option<bool>,
}

pub async fn list(ctx: &AppContext, search: Option<&str>) -> Result<()> {
    let mut instruments = ctx.instruments().await?;
    if let Some(query) = search {
        instruments.retain(|i| i.matches(query));
    }

    if ctx.json {
        return print_json(&instruments);
    }
    if instruments.is_empty() {
        println!("No instruments found.");
    } else {
        println!("{}", instruments_table(&instruments));
    }
    Ok(())
}

pub async fn add(ctx: &AppContext, symbol: String, name: String, market: MarketType, exchange: String) -> Result<()> {
    ctx.require_login()?;
    let new = NewInstrument {
        symbol,
        name,
        market_type: market,
        exchange,
    };
    let created = ctx.client.create_instrument(&new).await?;

    if ctx.json {
        return print_json(&created);
    }
    println!("Added {} (id {})", created.display_name(), created.id);
    Ok(())
}

pub async fn edit(ctx: &AppContext, reference: &str, changes: InstrumentChanges) -> Result<()> {
    ctx.require_login()?;
    let id = ctx.resolve_instrument(reference).await?;
    let instruments = ctx.client.list_instruments().await?;
    let mut instrument = instruments
        .into_iter()
        .find(|i| i.id == id)
        .with_context(|| format!("No instrument with id {}", id))?;

    if let Some(name) = changes.name {
        instrument.name = name;
    }
    if let Some(exchange) = changes.exchange {
        instrument.exchange = exchange;
    }
    if let Some(market) = changes.market {
        instrument.market_type = market;
    }
    if let Some(active) = changes.active {
        instrument.is_active = active;
    }

    let updated = ctx.client.update_instrument(&instrument).await?;
    if ctx.json {
        return print_json(&updated);
    }
    println!("Updated {}", updated.display_name());
    Ok(())
}

pub async fn sync(ctx: &AppContext, references: &[String], market: Option<MarketType>, days: u32) -> Result<()> {
    ctx.require_login()?;
    let instrument_ids = if references.is_empty() {
        None
    } else {
        Some(ctx.resolve_instruments(references).await?)
    };
    let request = KlineSyncRequest {
        instrument_ids,
        market_type: market,
        days,
    };
    let summary = ctx.client.sync_klines(&request).await?;

    if ctx.json {
        return print_json(&summary);
    }
    match summary.get("message").and_then(|m| m.as_str()) {
        Some(message) => println!("{}", message),
        None => println!("Sync requested for the last {} days.", days),
    }
    Ok(())
}
