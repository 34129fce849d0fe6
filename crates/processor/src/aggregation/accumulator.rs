//! Per-entity running aggregate for one window

use chrono::{DateTime, Utc};
use review_rollup_types::{BatchAggregateRow, ReviewEvent};
use serde::{Deserialize, Serialize};

use super::CounterAggregate;

/// Accumulates the events of one entity within one window
///
/// Sums are kept exactly and only turned into averages in [`finalize`], so
/// two accumulators for the same entity can be merged without loss.
///
/// [`finalize`]: EntityAccumulator::finalize
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityAccumulator {
    rating_sum: f64,
    useful_sum: i64,
    funny_sum: i64,
    cool_sum: i64,
    latest: Option<DateTime<Utc>>,
    count: u64,
}

impl EntityAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event in
    pub fn update(&mut self, event: &ReviewEvent) {
        self.rating_sum += event.rating;
        self.useful_sum = self.useful_sum.saturating_add(event.useful);
        self.funny_sum = self.funny_sum.saturating_add(event.funny);
        self.cool_sum = self.cool_sum.saturating_add(event.cool);
        self.latest = Some(
            self.latest
                .map_or(event.occurred_at, |latest| latest.max(event.occurred_at)),
        );
        self.count += 1;
    }

    /// Number of events folded in so far
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Mean rating, `None` before the first event
    pub fn mean_rating(&self) -> Option<f64> {
        (self.count > 0).then(|| self.rating_sum / self.count as f64)
    }

    /// Produce the batch row for `entity_id`; `None` if no event was seen
    pub fn finalize(&self, entity_id: &str, counters: CounterAggregate) -> Option<BatchAggregateRow> {
        let latest = self.latest?;
        let rating = self.mean_rating()?;

        let counter = |sum: i64| match counters {
            CounterAggregate::Sum => sum,
            CounterAggregate::Average => (sum as f64 / self.count as f64).round() as i64,
        };

        Some(BatchAggregateRow::new(
            entity_id,
            rating,
            (
                counter(self.useful_sum),
                counter(self.funny_sum),
                counter(self.cool_sum),
            ),
            latest,
            self.count,
        ))
    }
}
