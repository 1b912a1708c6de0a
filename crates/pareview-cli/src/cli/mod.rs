//! CLI entry and dispatch.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use pareview_core::models::{IndicatorType, MarketStage, MarketType, Period, ReviewType};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod context;

use context::AppContext;

#[derive(Parser, Debug)]
#[command(name = "pareview")]
#[command(version)]
#[command(about = "Review price-action trades, charts and indicators from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Read lists from the local cache instead of the backend
    #[arg(long, global = true)]
    offline: bool,

    /// Print raw JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Log in and save the session
    Login {
        /// Username (defaults to the last one used)
        #[arg(short, long)]
        username: Option<String>,

        /// Remember the password in the OS keychain
        #[arg(long)]
        remember: bool,
    },
    /// Clear the saved session and cache
    Logout,
    /// Show the logged-in user
    Whoami {
        /// Ask the backend whether the access token is still valid
        #[arg(long)]
        verify: bool,
    },
    /// Manage instruments
    Instruments {
        #[command(subcommand)]
        command: InstrumentCommands,
    },
    /// List K-line bars for an instrument
    Klines {
        /// Instrument ID or symbol
        instrument: String,

        /// Number of bars to request
        #[arg(long)]
        page_size: Option<u32>,
    },
    /// Print the chart option JSON for an instrument
    Chart {
        /// Instrument ID or symbol
        instrument: String,

        /// Overlay to include (MA5, MA10, MA20, MACD, RSI, KDJ, BOLL)
        #[arg(short, long = "indicator", value_name = "KEY")]
        indicators: Vec<String>,

        /// Number of bars to request
        #[arg(long)]
        page_size: Option<u32>,
    },
    /// Indicator results and calculation
    Indicators {
        #[command(subcommand)]
        command: IndicatorCommands,
    },
    /// Manage trade reviews
    Reviews {
        #[command(subcommand)]
        command: ReviewCommands,
    },
    /// Executed trades
    Trades {
        #[command(subcommand)]
        command: TradeCommands,
    },
    /// Headline counts, win rate and P/L
    Dashboard,
}

#[derive(clap::Subcommand, Debug)]
enum InstrumentCommands {
    /// List instruments
    List {
        /// Filter by symbol or name
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Add an instrument
    Add {
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        name: String,
        /// STOCK or FUTURES
        #[arg(long)]
        market: MarketType,
        #[arg(long)]
        exchange: String,
    },
    /// Edit an instrument
    Edit {
        /// Instrument ID or symbol
        instrument: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        exchange: Option<String>,
        #[arg(long)]
        market: Option<MarketType>,
        #[arg(long)]
        active: Option<bool>,
    },
    /// Import recent bars from the data provider
    Sync {
        /// Instrument IDs or symbols (default: all of --market)
        instruments: Vec<String>,
        /// Sync every instrument of this market type
        #[arg(long)]
        market: Option<MarketType>,
        /// Days of history to import (1-365)
        #[arg(long, default_value_t = 30)]
        days: u32,
    },
}

#[derive(clap::Subcommand, Debug)]
enum IndicatorCommands {
    /// List stored indicator results
    List,
    /// Calculate indicators for instruments over a date range
    Calc {
        /// Instrument IDs or symbols
        #[arg(required = true)]
        instruments: Vec<String>,
        /// Indicator types (MA, EMA, MACD, RSI, KDJ, BOLL)
        #[arg(short = 't', long = "type", value_name = "TYPE", required = true)]
        types: Vec<IndicatorType>,
        /// First day, YYYY-MM-DD
        #[arg(long)]
        start: chrono::NaiveDate,
        /// Last day, YYYY-MM-DD
        #[arg(long)]
        end: chrono::NaiveDate,
        /// Bar period: 1d, 1w or 1M
        #[arg(long, default_value = "1d")]
        timeframe: Period,
    },
}

/// Fields of the review form. Omitted fields keep their current value on
/// edit and their default on add.
#[derive(clap::Args, Debug, Clone, Default)]
struct ReviewFields {
    /// Instrument ID or symbol
    #[arg(long)]
    instrument: Option<String>,
    /// Review date, YYYY-MM-DD (default: today on add)
    #[arg(long)]
    date: Option<chrono::NaiveDate>,
    /// daily, weekly or monthly
    #[arg(long = "type")]
    review_type: Option<ReviewType>,
    /// uptrend, downtrend, consolidation or reversal
    #[arg(long)]
    stage: Option<MarketStage>,
    #[arg(long)]
    support: Option<String>,
    #[arg(long)]
    resistance: Option<String>,
    /// Analysis notes (10-5000 characters)
    #[arg(long)]
    notes: Option<String>,
    /// Rating 1-5
    #[arg(long)]
    rating: Option<u8>,
    /// Comma-separated tags
    #[arg(long)]
    tags: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum ReviewCommands {
    /// List reviews
    List,
    /// Show one review
    Show { id: i64 },
    /// Create a review
    Add {
        #[command(flatten)]
        fields: ReviewFields,
    },
    /// Edit a review
    Edit {
        id: i64,
        #[command(flatten)]
        fields: ReviewFields,
    },
    /// Delete a review
    Delete {
        id: i64,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(clap::Subcommand, Debug)]
enum TradeCommands {
    /// List trades
    List,
}

/// Initialize the tracing subscriber. `RUST_LOG` controls the level
/// (default `warn`); with a log file, output goes there through a
/// non-blocking writer whose guard must outlive the command.
fn init_tracing(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let Some(path) = log_file else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
        return Ok(None);
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .with_context(|| format!("--log-file {} does not name a file", path.display()))?;
    std::fs::create_dir_all(dir).with_context(|| format!("create log directory {}", dir.display()))?;

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();
    Ok(Some(guard))
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_file.as_deref())?;
    info!(offline = cli.offline, "pareview starting");

    let ctx = AppContext::new(cli.offline, cli.json)?;
    let result = dispatch(&ctx, cli.command).await;
    ctx.report_auth_events();
    result
}

async fn dispatch(ctx: &AppContext, command: Commands) -> Result<()> {
    match command {
        Commands::Login { username, remember } => commands::auth::login(ctx, username, remember).await,
        Commands::Logout => commands::auth::logout(ctx),
        Commands::Whoami { verify } => commands::auth::whoami(ctx, verify).await,

        Commands::Instruments { command } => match command {
            InstrumentCommands::List { search } => commands::instruments::list(ctx, search.as_deref()).await,
            InstrumentCommands::Add {
                symbol,
                name,
                market,
                exchange,
            } => commands::instruments::add(ctx, symbol, name, market, exchange).await,
            InstrumentCommands::Edit {
                instrument,
                name,
                exchange,
                market,
                active,
            } => {
                let changes = commands::instruments::InstrumentChanges {
                    name,
                    exchange,
                    market,
                    active,
                };
                commands::instruments::edit(ctx, &instrument, changes).await
            }
            InstrumentCommands::Sync {
                instruments,
                market,
                days,
            } => commands::instruments::sync(ctx, &instruments, market, days).await,
        },

        Commands::Klines { instrument, page_size } => commands::market::klines(ctx, &instrument, page_size).await,
        Commands::Chart {
            instrument,
            indicators,
            page_size,
        } => commands::market::chart(ctx, &instrument, &indicators, page_size).await,

        Commands::Indicators { command } => match command {
            IndicatorCommands::List => commands::market::list_indicators(ctx).await,
            IndicatorCommands::Calc {
                instruments,
                types,
                start,
                end,
                timeframe,
            } => commands::market::calculate(ctx, &instruments, types, start, end, timeframe).await,
        },

        Commands::Reviews { command } => match command {
            ReviewCommands::List => commands::reviews::list(ctx).await,
            ReviewCommands::Show { id } => commands::reviews::show(ctx, id).await,
            ReviewCommands::Add { fields } => commands::reviews::add(ctx, fields.into()).await,
            ReviewCommands::Edit { id, fields } => commands::reviews::edit(ctx, id, fields.into()).await,
            ReviewCommands::Delete { id, yes } => commands::reviews::delete(ctx, id, yes).await,
        },

        Commands::Trades { command } => match command {
            TradeCommands::List => commands::trades::list(ctx).await,
        },

        Commands::Dashboard => commands::trades::dashboard(ctx).await,
    }
}

impl From<ReviewFields> for commands::reviews::ReviewInput {
    fn from(f: ReviewFields) -> Self {
        Self {
            instrument: f.instrument,
            date: f.date,
            review_type: f.review_type,
            stage: f.stage,
            support: f.support,
            resistance: f.resistance,
            notes: f.notes,
            rating: f.rating,
            tags: f.tags,
        }
    }
}
