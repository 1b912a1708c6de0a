//! Review command handlers.

use std::io::{self, BufRead, Write};

use anyhow::Result;
use chrono::NaiveDate;
use pareview_core::models::{MarketStage, ReviewDraft, ReviewType};

use crate::cli::context::AppContext;
use crate::output::{print_json, review_detail, reviews_table};

/// Review form values from the command line. `None` leaves the draft as is.
#[derive(Debug, Default)]
pub struct ReviewInput {
    pub instrument: Option<String>,
    pub date: Option<NaiveDate>,
    pub review_type: Option<ReviewType>,
    pub stage: Option<MarketStage>,
    pub support: Option<String>,
    pub resistance: Option<String>,
    pub notes: Option<String>,
    pub rating: Option<u8>,
    pub tags: Option<String>,
}

impl ReviewInput {
    /// Overlay the given values onto a draft. The instrument is resolved by
    /// the caller.
    fn apply(self, draft: &mut ReviewDraft) {
        if let Some(date) = self.date {
            draft.review_date = Some(date);
        }
        if let Some(review_type) = self.review_type {
            draft.review_type = review_type;
        }
        if let Some(stage) = self.stage {
            draft.market_stage = stage;
        }
        if let Some(support) = self.support {
            draft.support_levels = support;
        }
        if let Some(resistance) = self.resistance {
            draft.resistance_levels = resistance;
        }
        if let Some(notes) = self.notes {
            draft.analysis_notes = notes;
        }
        if let Some(rating) = self.rating {
            draft.rating = Some(rating);
        }
        if let Some(tags) = self.tags {
            draft.tags = tags;
        }
    }
}

pub async fn list(ctx: &AppContext) -> Result<()> {
    let reviews = if ctx.offline {
        ctx.cached(ctx.cache.load_reviews(), "reviews")?
    } else {
        ctx.require_login()?;
        let reviews = ctx.client.list_reviews().await?;
        ctx.store(ctx.cache.save_reviews(&reviews), "reviews");
        reviews
    };

    if ctx.json {
        return print_json(&reviews);
    }
    if reviews.is_empty() {
        println!("No reviews yet.");
    } else {
        println!("{}", reviews_table(&reviews));
    }
    Ok(())
}

pub async fn show(ctx: &AppContext, id: i64) -> Result<()> {
    let review = if ctx.offline {
        let reviews = ctx.cached(ctx.cache.load_reviews(), "reviews")?;
        reviews
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| anyhow::anyhow!("Review {} is not in the cache", id))?
    } else {
        ctx.require_login()?;
        ctx.client.get_review(id).await?
    };

    if ctx.json {
        return print_json(&review);
    }
    println!("{}", review_detail(&review));
    Ok(())
}

pub async fn add(ctx: &AppContext, mut input: ReviewInput) -> Result<()> {
    ctx.require_login()?;
    let Some(reference) = input.instrument.take() else {
        anyhow::bail!("--instrument is required");
    };

    let mut draft = ReviewDraft {
        instrument: ctx.resolve_instrument(&reference).await?,
        review_date: Some(chrono::Local::now().date_naive()),
        ..ReviewDraft::default()
    };
    input.apply(&mut draft);

    let created = ctx.client.create_review(&draft).await?;
    if ctx.json {
        return print_json(&created);
    }
    println!("Created review {} for {}", created.id, created.instrument_label());
    Ok(())
}

pub async fn edit(ctx: &AppContext, id: i64, mut input: ReviewInput) -> Result<()> {
    ctx.require_login()?;
    let mut draft = ctx.client.get_review(id).await?.to_draft();
    if let Some(reference) = input.instrument.take() {
        draft.instrument = ctx.resolve_instrument(&reference).await?;
    }
    input.apply(&mut draft);

    let updated = ctx.client.update_review(id, &draft).await?;
    if ctx.json {
        return print_json(&updated);
    }
    println!("Updated review {}", updated.id);
    Ok(())
}

fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;
    let mut response = String::new();
    io::stdin().lock().read_line(&mut response)?;
    Ok(response.trim().eq_ignore_ascii_case("y"))
}

pub async fn delete(ctx: &AppContext, id: i64, yes: bool) -> Result<()> {
    ctx.require_login()?;
    if !yes && !confirm(&format!("Delete review {}?", id))? {
        println!("Cancelled.");
        return Ok(());
    }
    ctx.client.delete_review(id).await?;
    println!("Deleted review {}", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_overlays_only_given_fields() {
        let mut draft = ReviewDraft {
            instrument: 3,
            analysis_notes: "Original notes for the review.".into(),
            tags: "keep".into(),
            ..ReviewDraft::default()
        };
        let input = ReviewInput {
            stage: Some(MarketStage::Reversal),
            rating: Some(5),
            ..ReviewInput::default()
        };
        input.apply(&mut draft);

        assert_eq!(draft.market_stage, MarketStage::Reversal);
        assert_eq!(draft.rating, Some(5));
        assert_eq!(draft.tags, "keep");
        assert_eq!(draft.analysis_notes, "Original notes for the review.");
        assert_eq!(draft.instrument, 3);
    }
}
