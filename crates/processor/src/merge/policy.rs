//! Combine rules
//!
//! A [`CombinePolicy`] decides how an existing summary row and one batch's
//! row for the same entity fold into the next summary row. The policy is
//! chosen once per store and never mixed.

use review_rollup_types::{BatchAggregateRow, EntitySummary, ValidationError, ValidationResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How engagement counters combine across batches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterMode {
    /// `existing + batch`: counters are cumulative totals
    #[default]
    Additive,
    /// `round((existing + batch) / 2)`: counters are per-batch averages
    Averaging,
}

/// How ratings combine across batches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingMode {
    /// `(existing + batch) / 2`, regardless of how many reviews each side holds
    #[default]
    Unweighted,
    /// Mean weighted by each side's `sample_count`
    Weighted,
}

impl fmt::Display for CounterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CounterMode::Additive => write!(f, "additive"),
            CounterMode::Averaging => write!(f, "averaging"),
        }
    }
}

impl fmt::Display for RatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RatingMode::Unweighted => write!(f, "unweighted"),
            RatingMode::Weighted => write!(f, "weighted"),
        }
    }
}

/// The combine rules a store is built up with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CombinePolicy {
    #[serde(default)]
    pub counter_mode: CounterMode,
    #[serde(default)]
    pub rating_mode: RatingMode,
}

impl fmt::Display for CombinePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "counters={}, rating={}",
            self.counter_mode, self.rating_mode
        )
    }
}

impl CombinePolicy {
    pub fn new(counter_mode: CounterMode, rating_mode: RatingMode) -> Self {
        Self {
            counter_mode,
            rating_mode,
        }
    }

    /// Fold one batch row into the existing summary for the same entity
    ///
    /// Order-sensitive across more than two batches: combining A, then B, then
    /// C gives a different unweighted rating than C, then B, then A.
    pub fn combine(
        &self,
        existing: &EntitySummary,
        batch: &BatchAggregateRow,
    ) -> ValidationResult<EntitySummary> {
        let entity_id = &existing.entity_id;

        Ok(EntitySummary {
            entity_id: entity_id.clone(),
            rating: self.combine_rating(existing, batch),
            useful: self.combine_counter(entity_id, "useful", existing.useful, batch.useful)?,
            funny: self.combine_counter(entity_id, "funny", existing.funny, batch.funny)?,
            cool: self.combine_counter(entity_id, "cool", existing.cool, batch.cool)?,
            latest_activity_at: existing.latest_activity_at.max(batch.latest_activity_at),
            sample_count: existing.sample_count.saturating_add(batch.sample_count),
        })
    }

    fn combine_rating(&self, existing: &EntitySummary, batch: &BatchAggregateRow) -> f64 {
        match self.rating_mode {
            RatingMode::Unweighted => (existing.rating + batch.rating) / 2.0,
            RatingMode::Weighted => {
                let total = existing.sample_count.saturating_add(batch.sample_count);
                if total == 0 {
                    return (existing.rating + batch.rating) / 2.0;
                }
                (existing.rating * existing.sample_count as f64
                    + batch.rating * batch.sample_count as f64)
                    / total as f64
            }
        }
    }

    fn combine_counter(
        &self,
        entity_id: &str,
        counter: &'static str,
        existing: i64,
        batch: i64,
    ) -> ValidationResult<i64> {
        match self.counter_mode {
            CounterMode::Additive => {
                existing
                    .checked_add(batch)
                    .ok_or_else(|| ValidationError::CounterOverflow {
                        entity_id: entity_id.to_string(),
                        counter,
                    })
            }
            CounterMode::Averaging => {
                let sum = existing as i128 + batch as i128;
                Ok((sum as f64 / 2.0).round() as i64)
            }
        }
    }
}

/// Accepted rating interval for incoming batch rows
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingRange {
    pub min: f64,
    pub max: f64,
}

impl Default for RatingRange {
    fn default() -> Self {
        Self { min: 1.0, max: 5.0 }
    }
}

impl RatingRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn check(&self, entity_id: &str, rating: f64) -> ValidationResult<()> {
        if rating < self.min || rating > self.max {
            return Err(ValidationError::RatingOutOfRange {
                entity_id: entity_id.to_string(),
                rating,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}
