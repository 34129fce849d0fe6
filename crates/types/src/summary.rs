//! Summary rows: the persisted per-entity state and one batch's aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{ValidationError, ValidationResult};

/// Persistent running summary for one entity
///
/// `rating` is the current best-known average: an average of batch averages,
/// not a mean over every underlying review. `latest_activity_at` is the
/// entity's watermark and never moves backwards across merges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySummary {
    pub entity_id: String,
    pub rating: f64,
    pub useful: i64,
    pub funny: i64,
    pub cool: i64,
    pub latest_activity_at: DateTime<Utc>,
    /// Raw events folded into this row so far
    #[serde(default)]
    pub sample_count: u64,
}

impl EntitySummary {
    /// Check the field constraints every stored row must satisfy
    pub fn validate(&self) -> ValidationResult<()> {
        check_fields(
            &self.entity_id,
            self.rating,
            [
                ("useful", self.useful),
                ("funny", self.funny),
                ("cool", self.cool),
            ],
        )
    }

    /// Counter values in (name, value) form
    pub fn counters(&self) -> [(&'static str, i64); 3] {
        [
            ("useful", self.useful),
            ("funny", self.funny),
            ("cool", self.cool),
        ]
    }
}

/// One entity's aggregate for a single window
///
/// Transient: produced by a batch aggregator and consumed by one merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchAggregateRow {
    pub entity_id: String,
    pub rating: f64,
    pub useful: i64,
    pub funny: i64,
    pub cool: i64,
    pub latest_activity_at: DateTime<Utc>,
    /// Raw events behind this aggregate
    #[serde(default)]
    pub sample_count: u64,
}

impl BatchAggregateRow {
    /// Create a batch row from already-aggregated values
    pub fn new(
        entity_id: impl Into<String>,
        rating: f64,
        counters: (i64, i64, i64),
        latest_activity_at: DateTime<Utc>,
        sample_count: u64,
    ) -> Self {
        let (useful, funny, cool) = counters;
        Self {
            entity_id: entity_id.into(),
            rating,
            useful,
            funny,
            cool,
            latest_activity_at,
            sample_count,
        }
    }

    pub fn validate(&self) -> ValidationResult<()> {
        check_fields(
            &self.entity_id,
            self.rating,
            [
                ("useful", self.useful),
                ("funny", self.funny),
                ("cool", self.cool),
            ],
        )
    }
}

impl From<BatchAggregateRow> for EntitySummary {
    fn from(row: BatchAggregateRow) -> Self {
        Self {
            entity_id: row.entity_id,
            rating: row.rating,
            useful: row.useful,
            funny: row.funny,
            cool: row.cool,
            latest_activity_at: row.latest_activity_at,
            sample_count: row.sample_count,
        }
    }
}

fn check_fields(
    entity_id: &str,
    rating: f64,
    counters: [(&'static str, i64); 3],
) -> ValidationResult<()> {
    if entity_id.is_empty() {
        return Err(ValidationError::EmptyEntityId);
    }
    if !rating.is_finite() {
        return Err(ValidationError::NonFiniteRating {
            entity_id: entity_id.to_string(),
            rating,
        });
    }
    for (counter, value) in counters {
        if value < 0 {
            return Err(ValidationError::NegativeCounter {
                entity_id: entity_id.to_string(),
                counter,
                value,
            });
        }
    }
    Ok(())
}
