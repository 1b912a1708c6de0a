use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::de;
use super::ValidationError;

/// Bounds on the length of a review's analysis notes, in characters.
pub const NOTES_MIN_CHARS: usize = 10;
pub const NOTES_MAX_CHARS: usize = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum ReviewType {
    #[default]
    #[serde(alias = "DAILY")]
    Daily,
    #[serde(alias = "WEEKLY")]
    Weekly,
    #[serde(alias = "MONTHLY")]
    Monthly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum MarketStage {
    #[serde(alias = "UPTREND")]
    Uptrend,
    #[serde(alias = "DOWNTREND")]
    Downtrend,
    #[default]
    #[serde(alias = "CONSOLIDATION")]
    Consolidation,
    #[serde(alias = "REVERSAL")]
    Reversal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
    Breakeven,
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum PositionType {
    #[serde(alias = "LONG")]
    Long,
    #[serde(alias = "SHORT")]
    Short,
}

macro_rules! lenient_from_str {
    ($ty:ty, $what:literal, { $($name:literal => $variant:expr),+ $(,)? }) => {
        impl std::str::FromStr for $ty {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($name => Ok($variant),)+
                    other => Err(ValidationError::new(format!(concat!("unknown ", $what, ": {}"), other))),
                }
            }
        }
    };
}

macro_rules! lowercase_display {
    ($ty:ty, { $($variant:pat => $name:literal),+ $(,)? }) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let name = match self {
                    $($variant => $name,)+
                };
                f.write_str(name)
            }
        }
    };
}

lowercase_display!(ReviewType, {
    ReviewType::Daily => "daily",
    ReviewType::Weekly => "weekly",
    ReviewType::Monthly => "monthly",
});

lowercase_display!(MarketStage, {
    MarketStage::Uptrend => "uptrend",
    MarketStage::Downtrend => "downtrend",
    MarketStage::Consolidation => "consolidation",
    MarketStage::Reversal => "reversal",
});

lowercase_display!(Outcome, {
    Outcome::Win => "win",
    Outcome::Loss => "loss",
    Outcome::Breakeven => "breakeven",
    Outcome::Pending => "pending",
});

lowercase_display!(PositionType, {
    PositionType::Long => "long",
    PositionType::Short => "short",
});

lenient_from_str!(ReviewType, "review type", {
    "daily" => ReviewType::Daily,
    "weekly" => ReviewType::Weekly,
    "monthly" => ReviewType::Monthly,
});

lenient_from_str!(MarketStage, "market stage", {
    "uptrend" => MarketStage::Uptrend,
    "downtrend" => MarketStage::Downtrend,
    "consolidation" => MarketStage::Consolidation,
    "reversal" => MarketStage::Reversal,
});

lenient_from_str!(PositionType, "position type", {
    "long" => PositionType::Long,
    "short" => PositionType::Short,
});

/// A stored trade review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub id: i64,
    pub instrument: i64,
    #[serde(default)]
    pub instrument_name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    pub review_date: String,
    #[serde(default)]
    pub review_type: Option<ReviewType>,
    // Older records used "market_phase".
    #[serde(default, alias = "market_phase")]
    pub market_stage: Option<MarketStage>,
    #[serde(default)]
    pub timeframe: Option<String>,
    #[serde(default)]
    pub support_levels: Option<String>,
    #[serde(default)]
    pub resistance_levels: Option<String>,
    #[serde(default, deserialize_with = "de::optional_decimal")]
    pub entry_price: Option<f64>,
    #[serde(default, deserialize_with = "de::optional_decimal")]
    pub exit_price: Option<f64>,
    #[serde(default, deserialize_with = "de::optional_decimal")]
    pub stop_loss: Option<f64>,
    #[serde(default, deserialize_with = "de::optional_decimal")]
    pub take_profit: Option<f64>,
    #[serde(default)]
    pub position_type: Option<PositionType>,
    #[serde(default)]
    pub analysis_notes: Option<String>,
    #[serde(default)]
    pub outcome: Option<Outcome>,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default, deserialize_with = "de::tags")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl ReviewRecord {
    /// Instrument name, falling back to "#<id>".
    pub fn instrument_label(&self) -> String {
        self.instrument_name
            .clone()
            .unwrap_or_else(|| format!("#{}", self.instrument))
    }

    /// Reward-to-risk of the planned trade, when entry, stop and target are
    /// all set and the stop is on the losing side.
    pub fn risk_reward(&self) -> Option<f64> {
        let entry = self.entry_price?;
        let stop = self.stop_loss?;
        let target = self.take_profit?;
        let risk = (entry - stop).abs();
        if risk == 0.0 {
            return None;
        }
        let stop_on_loss_side = match self.position_type {
            Some(PositionType::Short) => stop > entry,
            _ => stop < entry,
        };
        if !stop_on_loss_side {
            return None;
        }
        Some((target - entry).abs() / risk)
    }

    /// Form state for editing this review.
    pub fn to_draft(&self) -> ReviewDraft {
        ReviewDraft {
            instrument: self.instrument,
            review_date: NaiveDate::parse_from_str(&self.review_date, "%Y-%m-%d").ok(),
            review_type: self.review_type.unwrap_or_default(),
            market_stage: self.market_stage.unwrap_or_default(),
            support_levels: self.support_levels.clone().unwrap_or_default(),
            resistance_levels: self.resistance_levels.clone().unwrap_or_default(),
            analysis_notes: self.analysis_notes.clone().unwrap_or_default(),
            rating: Some(self.rating.unwrap_or(3)),
            tags: self.tags.join(", "),
        }
    }
}

/// Create/edit form for a review. `tags` is the raw comma-separated input.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewDraft {
    pub instrument: i64,
    pub review_date: Option<NaiveDate>,
    pub review_type: ReviewType,
    pub market_stage: MarketStage,
    pub support_levels: String,
    pub resistance_levels: String,
    pub analysis_notes: String,
    pub rating: Option<u8>,
    pub tags: String,
}

impl Default for ReviewDraft {
    fn default() -> Self {
        Self {
            instrument: 0,
            review_date: None,
            review_type: ReviewType::Daily,
            market_stage: MarketStage::Consolidation,
            support_levels: String::new(),
            resistance_levels: String::new(),
            analysis_notes: String::new(),
            rating: Some(3),
            tags: String::new(),
        }
    }
}

/// JSON body sent for create and update.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewPayload {
    pub instrument: i64,
    pub review_date: String,
    pub review_type: ReviewType,
    pub market_stage: MarketStage,
    pub support_levels: String,
    pub resistance_levels: String,
    pub analysis_notes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    pub tags: Vec<String>,
}

impl ReviewDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.instrument < 1 {
            return Err(ValidationError::new("select an instrument"));
        }
        if self.review_date.is_none() {
            return Err(ValidationError::new("review date is required"));
        }
        let notes_len = self.analysis_notes.chars().count();
        if notes_len < NOTES_MIN_CHARS {
            return Err(ValidationError::new(format!(
                "analysis notes need at least {} characters",
                NOTES_MIN_CHARS
            )));
        }
        if notes_len > NOTES_MAX_CHARS {
            return Err(ValidationError::new(format!(
                "analysis notes cannot exceed {} characters",
                NOTES_MAX_CHARS
            )));
        }
        if let Some(rating) = self.rating {
            if !(1..=5).contains(&rating) {
                return Err(ValidationError::new("rating must be between 1 and 5"));
            }
        }
        Ok(())
    }

    /// Validate and build the request body.
    pub fn to_payload(&self) -> Result<ReviewPayload, ValidationError> {
        self.validate()?;
        let review_date = self
            .review_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        Ok(ReviewPayload {
            instrument: self.instrument,
            review_date,
            review_type: self.review_type,
            market_stage: self.market_stage,
            support_levels: self.support_levels.clone(),
            resistance_levels: self.resistance_levels.clone(),
            analysis_notes: self.analysis_notes.clone(),
            rating: self.rating,
            tags: de::split_tags(&self.tags),
        })
    }
}
