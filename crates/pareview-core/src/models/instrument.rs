use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Serialized as `STOCK`/`FUTURES`; decoding accepts any case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum MarketType {
    #[serde(rename = "STOCK")]
    Stock,
    #[serde(rename = "FUTURES")]
    Futures,
}

impl MarketType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketType::Stock => "STOCK",
            MarketType::Futures => "FUTURES",
        }
    }
}

impl std::fmt::Display for MarketType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MarketType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STOCK" => Ok(MarketType::Stock),
            "FUTURES" => Ok(MarketType::Futures),
            other => Err(ValidationError::new(format!("unknown market type: {}", other))),
        }
    }
}

impl<'de> Deserialize<'de> for MarketType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Instrument {
    pub id: i64,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub exchange: String,
    // The list serializer has used both names over time.
    #[serde(alias = "instrument_type")]
    pub market_type: MarketType,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

fn default_active() -> bool {
    true
}

impl Instrument {
    /// "600519 Kweichow Moutai"
    pub fn display_name(&self) -> String {
        format!("{} {}", self.symbol, self.name)
    }

    /// Case-insensitive match on symbol or name.
    pub fn matches(&self, query: &str) -> bool {
        let q = query.to_lowercase();
        self.symbol.to_lowercase().contains(&q) || self.name.to_lowercase().contains(&q)
    }
}

/// Body for creating an instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInstrument {
    pub symbol: String,
    pub name: String,
    pub market_type: MarketType,
    pub exchange: String,
}

impl NewInstrument {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.symbol.trim().is_empty() {
            return Err(ValidationError::new("symbol is required"));
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::new("name is required"));
        }
        if self.exchange.trim().is_empty() {
            return Err(ValidationError::new("exchange is required"));
        }
        Ok(())
    }
}

/// Lowest and highest accepted `days` for a K-line sync.
pub const SYNC_DAYS_RANGE: std::ops::RangeInclusive<u32> = 1..=365;

/// Body for `klines/batch-import/`: pull recent bars for the selected
/// instruments, or for every instrument of a market type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KlineSyncRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrument_ids: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_type: Option<MarketType>,
    pub days: u32,
}

impl KlineSyncRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !SYNC_DAYS_RANGE.contains(&self.days) {
            return Err(ValidationError::new(format!(
                "sync days must be between {} and {}",
                SYNC_DAYS_RANGE.start(),
                SYNC_DAYS_RANGE.end()
            )));
        }
        let has_ids = self.instrument_ids.as_ref().is_some_and(|ids| !ids.is_empty());
        if !has_ids && self.market_type.is_none() {
            return Err(ValidationError::new(
                "select at least one instrument or a market type",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrument_accepts_either_type_field() {
        let a: Instrument = serde_json::from_str(
            r#"{"id": 1, "symbol": "600519", "name": "Moutai", "exchange": "SSE", "market_type": "STOCK"}"#,
        )
        .unwrap();
        assert_eq!(a.market_type, MarketType::Stock);
        assert!(a.is_active);

        let b: Instrument = serde_json::from_str(
            r#"{"id": 2, "symbol": "IF2409", "name": "CSI 300", "instrument_type": "futures", "is_active": false}"#,
        )
        .unwrap();
        assert_eq!(b.market_type, MarketType::Futures);
        assert!(!b.is_active);
        assert_eq!(b.exchange, "");
    }

    #[test]
    fn test_market_type_from_str() {
        assert_eq!("stock".parse::<MarketType>().unwrap(), MarketType::Stock);
        assert_eq!(" Futures ".parse::<MarketType>().unwrap(), MarketType::Futures);
        assert!("bonds".parse::<MarketType>().is_err());
    }

    #[test]
    fn test_market_type_decodes_any_case() {
        for raw in [r#""STOCK""#, r#""stock""#, r#""Stock""#] {
            assert_eq!(serde_json::from_str::<MarketType>(raw).unwrap(), MarketType::Stock);
        }
        assert_eq!(serde_json::from_str::<MarketType>(r#""Futures""#).unwrap(), MarketType::Futures);
        assert!(serde_json::from_str::<MarketType>(r#""BONDS""#).is_err());
        assert_eq!(serde_json::to_string(&MarketType::Futures).unwrap(), r#""FUTURES""#);
    }

    #[test]
    fn test_instrument_matches() {
        let i = Instrument {
            id: 1,
            symbol: "AAPL".into(),
            name: "Apple Inc".into(),
            exchange: "NASDAQ".into(),
            market_type: MarketType::Stock,
            is_active: true,
            created_at: None,
            updated_at: None,
        };
        assert!(i.matches("aap"));
        assert!(i.matches("APPLE"));
        assert!(!i.matches("msft"));
        assert_eq!(i.display_name(), "AAPL Apple Inc");
    }

    #[test]
    fn test_new_instrument_validation() {
        let mut n = NewInstrument {
            symbol: "000001".into(),
            name: "Ping An Bank".into(),
            market_type: MarketType::Stock,
            exchange: "SZSE".into(),
        };
        assert!(n.validate().is_ok());
        n.symbol = "  ".into();
        assert!(n.validate().is_err());
    }

    #[test]
    fn test_sync_request_days_bounds() {
        let mut req = KlineSyncRequest {
            instrument_ids: Some(vec![1]),
            market_type: None,
            days: 30,
        };
        assert!(req.validate().is_ok());
        req.days = 0;
        assert!(req.validate().is_err());
        req.days = 366;
        assert!(req.validate().is_err());
        req.days = 365;
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_sync_request_needs_a_target() {
        let req = KlineSyncRequest {
            instrument_ids: Some(vec![]),
            market_type: None,
            days: 10,
        };
        assert!(req.validate().is_err());

        let by_market = KlineSyncRequest {
            instrument_ids: None,
            market_type: Some(MarketType::Futures),
            days: 10,
        };
        assert!(by_market.validate().is_ok());
        let body = serde_json::to_value(&by_market).unwrap();
        assert_eq!(body, serde_json::json!({"market_type": "FUTURES", "days": 10}));
    }
}
