use serde::{Deserialize, Serialize};

use super::{Instrument, Outcome, ReviewRecord, TradeLog};

/// Headline numbers for the dashboard view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct DashboardStats {
    pub total_instruments: usize,
    pub total_reviews: usize,
    pub total_trades: usize,
    /// Winning share of closed trades, 0..=100. None with no closed trades.
    pub win_rate: Option<f64>,
    /// Sum of realized P/L over closed trades. None with no closed trades.
    pub total_profit_loss: Option<f64>,
}

impl DashboardStats {
    pub fn compute(instruments: &[Instrument], reviews: &[ReviewRecord], trades: &[TradeLog]) -> Self {
        let realized: Vec<f64> = trades.iter().filter_map(TradeLog::realized_pnl).collect();
        let (win_rate, total_profit_loss) = if realized.is_empty() {
            (None, None)
        } else {
            let wins = trades.iter().filter(|t| t.outcome() == Outcome::Win).count();
            (
                Some(wins as f64 / realized.len() as f64 * 100.0),
                Some(realized.iter().sum()),
            )
        };

        Self {
            total_instruments: instruments.len(),
            total_reviews: reviews.len(),
            total_trades: trades.len(),
            win_rate,
            total_profit_loss,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trades(body: &str) -> Vec<TradeLog> {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_empty_dashboard() {
        let stats = DashboardStats::compute(&[], &[], &[]);
        assert_eq!(stats, DashboardStats::default());
    }

    #[test]
    fn test_win_rate_counts_closed_trades_only() {
        let t = trades(
            r#"[
                {"id": 1, "entry_price": 10, "exit_price": 12, "quantity": 1, "position_type": "long"},
                {"id": 2, "entry_price": 10, "exit_price": 9, "quantity": 1, "position_type": "long"},
                {"id": 3, "entry_price": 10, "exit_price": 8, "quantity": 2, "position_type": "short"},
                {"id": 4, "entry_price": 10, "quantity": 1, "position_type": "long"}
            ]"#,
        );
        let stats = DashboardStats::compute(&[], &[], &t);
        assert_eq!(stats.total_trades, 4);
        let rate = stats.win_rate.unwrap();
        assert!((rate - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.total_profit_loss, Some(5.0));
    }
}
