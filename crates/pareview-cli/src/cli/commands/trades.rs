//! Trade and dashboard command handlers.

use anyhow::Result;
use pareview_core::models::DashboardStats;

use crate::cli::context::AppContext;
use crate::output::{dashboard_table, print_json, trades_table};

pub async fn list(ctx: &AppContext) -> Result<()> {
    let trades = if ctx.offline {
        ctx.cached(ctx.cache.load_trades(), "trades")?
    } else {
        ctx.require_login()?;
        let trades = ctx.client.list_trades().await?;
        ctx.store(ctx.cache.save_trades(&trades), "trades");
        trades
    };

    if ctx.json {
        return print_json(&trades);
    }
    if trades.is_empty() {
        println!("No trades recorded.");
    } else {
        println!("{}", trades_table(&trades));
    }
    Ok(())
}

pub async fn dashboard(ctx: &AppContext) -> Result<()> {
    let stats = if ctx.offline {
        let instruments = ctx.cached(ctx.cache.load_instruments(), "instruments")?;
        let reviews = ctx.cached(ctx.cache.load_reviews(), "reviews")?;
        let trades = ctx.cached(ctx.cache.load_trades(), "trades")?;
        DashboardStats::compute(&instruments, &reviews, &trades)
    } else {
        ctx.require_login()?;
        ctx.client.dashboard_stats().await?
    };

    if ctx.json {
        return print_json(&stats);
    }
    println!("{}", dashboard_table(&stats));
    if ctx.offline {
        println!("Cache updated {}", ctx.cache.get_cache_ages().last_updated());
    }
    Ok(())
}
