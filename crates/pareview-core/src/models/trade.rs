use serde::{Deserialize, Serialize};

use super::de;
use super::{Outcome, PositionType};

/// An executed trade, optionally attached to a review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeLog {
    pub id: i64,
    #[serde(default, alias = "review_record")]
    pub review: Option<i64>,
    #[serde(default)]
    pub instrument: Option<i64>,
    #[serde(default, alias = "trade_date")]
    pub entry_time: Option<String>,
    #[serde(default)]
    pub exit_time: Option<String>,
    #[serde(deserialize_with = "de::decimal")]
    pub entry_price: f64,
    #[serde(default, deserialize_with = "de::optional_decimal")]
    pub exit_price: Option<f64>,
    #[serde(deserialize_with = "de::decimal")]
    pub quantity: f64,
    #[serde(alias = "trade_type")]
    pub position_type: PositionType,
    #[serde(default, deserialize_with = "de::optional_decimal")]
    pub profit_loss: Option<f64>,
    #[serde(default, alias = "profit_loss_pct", deserialize_with = "de::optional_decimal")]
    pub profit_loss_percentage: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl TradeLog {
    /// Realized P/L: the reported figure, else derived from entry, exit and
    /// quantity. None while the trade is open.
    pub fn realized_pnl(&self) -> Option<f64> {
        if let Some(pnl) = self.profit_loss {
            return Some(pnl);
        }
        let exit = self.exit_price?;
        let per_unit = match self.position_type {
            PositionType::Long => exit - self.entry_price,
            PositionType::Short => self.entry_price - exit,
        };
        Some(per_unit * self.quantity)
    }

    pub fn outcome(&self) -> Outcome {
        match self.realized_pnl() {
            None => Outcome::Pending,
            Some(p) if p > 0.0 => Outcome::Win,
            Some(p) if p < 0.0 => Outcome::Loss,
            Some(_) => Outcome::Breakeven,
        }
    }
}
