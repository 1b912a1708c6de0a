//! Chart option assembly for the K-line view.
//!
//! Produces an ECharts-compatible option document; rendering is left to
//! whatever consumes the JSON.

pub mod kline_chart;

pub use kline_chart::{build_kline_chart, CANDLE_SERIES, VOLUME_SERIES};
