//! Batch aggregator trait

use async_trait::async_trait;
use review_rollup_types::BatchAggregateRow;

use crate::error::AggregatorResult;
use crate::window::WindowBounds;

/// Source of per-entity batch aggregates
///
/// ## Implementation Requirements
///
/// - Only events with `window.start <= occurred_at < window.end` count
/// - At most one row per entity id per call
/// - Re-aggregating the same window yields the same rows
#[async_trait]
pub trait BatchAggregator: Send + Sync {
    /// Aggregate every entity with at least one event in `window`
    async fn aggregate(&self, window: &WindowBounds) -> AggregatorResult<Vec<BatchAggregateRow>>;
}

#[async_trait]
impl<A: BatchAggregator + ?Sized> BatchAggregator for std::sync::Arc<A> {
    async fn aggregate(&self, window: &WindowBounds) -> AggregatorResult<Vec<BatchAggregateRow>> {
        (**self).aggregate(window).await
    }
}
