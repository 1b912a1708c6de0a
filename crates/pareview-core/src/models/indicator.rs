use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::de;
use super::{Period, ValidationError};

/// Overlay series the chart view can request per instrument.
pub const CHART_OVERLAYS: [&str; 7] = ["MA5", "MA10", "MA20", "MACD", "RSI", "KDJ", "BOLL"];

/// Indicator families the backend can compute in bulk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "UPPERCASE")]
pub enum IndicatorType {
    Ma,
    Ema,
    Macd,
    Rsi,
    Kdj,
    Boll,
}

impl IndicatorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorType::Ma => "MA",
            IndicatorType::Ema => "EMA",
            IndicatorType::Macd => "MACD",
            IndicatorType::Rsi => "RSI",
            IndicatorType::Kdj => "KDJ",
            IndicatorType::Boll => "BOLL",
        }
    }
}

impl std::fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for IndicatorType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MA" => Ok(IndicatorType::Ma),
            "EMA" => Ok(IndicatorType::Ema),
            "MACD" => Ok(IndicatorType::Macd),
            "RSI" => Ok(IndicatorType::Rsi),
            "KDJ" => Ok(IndicatorType::Kdj),
            "BOLL" => Ok(IndicatorType::Boll),
            other => Err(ValidationError::new(format!("unknown indicator type: {}", other))),
        }
    }
}

/// Normalize an overlay key ("ma5" -> "MA5"), rejecting unknown ones.
pub fn parse_overlay(key: &str) -> Result<String, ValidationError> {
    let upper = key.trim().to_ascii_uppercase();
    if CHART_OVERLAYS.contains(&upper.as_str()) {
        Ok(upper)
    } else {
        Err(ValidationError::new(format!(
            "unknown indicator {}; expected one of {}",
            key,
            CHART_OVERLAYS.join(", ")
        )))
    }
}

/// A stored computation result as listed by `indicators/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorRecord {
    pub id: i64,
    #[serde(default)]
    pub instrument: Option<i64>,
    #[serde(default)]
    pub instrument_name: Option<String>,
    pub indicator_type: String,
    #[serde(default)]
    pub trade_date: Option<String>,
    #[serde(default)]
    pub calculated_at: Option<String>,
    #[serde(default)]
    pub indicator_data: Option<serde_json::Value>,
}

/// One point of an overlay series. `value` is null where the window has not
/// filled yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct IndicatorPoint {
    #[serde(default)]
    pub trade_date: Option<String>,
    #[serde(default, deserialize_with = "de::optional_decimal")]
    pub value: Option<f64>,
}

/// Body for `indicators/batch-calculate/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchCalculateRequest {
    pub instrument_ids: Vec<i64>,
    pub indicator_types: Vec<IndicatorType>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub timeframe: Period,
}

impl BatchCalculateRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.instrument_ids.is_empty() {
            return Err(ValidationError::new("select at least one instrument"));
        }
        if self.indicator_types.is_empty() {
            return Err(ValidationError::new("select at least one indicator"));
        }
        let start = self
            .start_date
            .ok_or_else(|| ValidationError::new("start date is required"))?;
        let end = self
            .end_date
            .ok_or_else(|| ValidationError::new("end date is required"))?;
        if start > end {
            return Err(ValidationError::new("start date cannot be after end date"));
        }
        if !self.timeframe.is_indicator_timeframe() {
            return Err(ValidationError::new(format!(
                "indicators are computed on 1d, 1w or 1M bars, not {}",
                self.timeframe
            )));
        }
        Ok(())
    }
}
