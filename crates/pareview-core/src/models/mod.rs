//! Data models for the price-action review backend.
//!
//! This module contains the structures exchanged with the REST API:
//!
//! - `User`: the authenticated account
//! - `Instrument`, `NewInstrument`, `KlineSyncRequest`: tradable symbols
//! - `KLine`, `Period`: candlestick bars
//! - `IndicatorRecord`, `IndicatorPoint`, `BatchCalculateRequest`: indicators
//! - `ReviewRecord`, `ReviewDraft`: trade reviews
//! - `TradeLog`: executed trades
//! - `DashboardStats`: aggregate counts
//!
//! Form-level checks live next to the request types and fail with
//! `ValidationError` before anything is sent.

pub mod dashboard;
pub(crate) mod de;
pub mod indicator;
pub mod instrument;
pub mod kline;
pub mod page;
pub mod review;
pub mod trade;
pub mod user;

use thiserror::Error;

pub use dashboard::DashboardStats;
pub use indicator::{parse_overlay, BatchCalculateRequest, IndicatorPoint, IndicatorRecord, IndicatorType, CHART_OVERLAYS};
pub use instrument::{Instrument, KlineSyncRequest, MarketType, NewInstrument};
pub use kline::{sort_chronologically, KLine, Period};
pub use page::ListPayload;
pub use review::{MarketStage, Outcome, PositionType, ReviewDraft, ReviewPayload, ReviewRecord, ReviewType};
pub use trade::TradeLog;
pub use user::User;

/// A form-level rule was violated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
