use serde::{Deserialize, Serialize};

use super::de;
use super::ValidationError;

/// Bar period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum Period {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[default]
    #[serde(rename = "1d")]
    Day,
    #[serde(rename = "1w")]
    Week,
    #[serde(rename = "1M")]
    Month,
}

impl Period {
    pub const ALL: [Period; 8] = [
        Period::OneMinute,
        Period::FiveMinutes,
        Period::FifteenMinutes,
        Period::ThirtyMinutes,
        Period::OneHour,
        Period::Day,
        Period::Week,
        Period::Month,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::OneMinute => "1m",
            Period::FiveMinutes => "5m",
            Period::FifteenMinutes => "15m",
            Period::ThirtyMinutes => "30m",
            Period::OneHour => "1h",
            Period::Day => "1d",
            Period::Week => "1w",
            Period::Month => "1M",
        }
    }

    /// Periods the backend computes indicators on.
    pub fn is_indicator_timeframe(&self) -> bool {
        matches!(self, Period::Day | Period::Week | Period::Month)
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Period {
    type Err = ValidationError;

    // Case matters: "1m" is a minute, "1M" a month.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Period::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s.trim())
            .ok_or_else(|| ValidationError::new(format!("unknown period: {}", s)))
    }
}

/// One candlestick bar.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct KLine {
    #[serde(default)]
    pub id: i64,
    pub instrument: i64,
    pub trade_date: String,
    #[serde(default)]
    pub trade_time: Option<String>,
    #[serde(deserialize_with = "de::decimal")]
    pub open_price: f64,
    #[serde(deserialize_with = "de::decimal")]
    pub high_price: f64,
    #[serde(deserialize_with = "de::decimal")]
    pub low_price: f64,
    #[serde(deserialize_with = "de::decimal")]
    pub close_price: f64,
    #[serde(deserialize_with = "de::decimal")]
    pub volume: f64,
    #[serde(default, deserialize_with = "de::optional_decimal")]
    pub amount: Option<f64>,
    #[serde(default)]
    pub period: Period,
}

impl KLine {
    /// Axis label: the date, plus the time for intraday bars.
    pub fn label(&self) -> String {
        match self.trade_time {
            Some(ref t) if !t.is_empty() => format!("{} {}", self.trade_date, t),
            _ => self.trade_date.clone(),
        }
    }

    pub fn is_bullish(&self) -> bool {
        self.close_price >= self.open_price
    }

    /// Close-to-open change as a percentage of the open.
    pub fn change_percent(&self) -> Option<f64> {
        if self.open_price == 0.0 {
            None
        } else {
            Some((self.close_price - self.open_price) / self.open_price * 100.0)
        }
    }
}

/// Order bars oldest-first by date then time; the backend lists newest
/// first.
pub fn sort_chronologically(bars: &mut [KLine]) {
    bars.sort_by(|a, b| {
        a.trade_date
            .cmp(&b.trade_date)
            .then_with(|| a.trade_time.cmp(&b.trade_time))
    });
}
