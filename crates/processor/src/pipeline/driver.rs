//! Sequential window driver

use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::aggregation::BatchAggregator;
use crate::error::Result;
use crate::merge::{MergeEngine, MergeReport};
use crate::reporter::{MetricsReporter, SummaryReport};
use crate::window::{WindowBounds, WindowSchedule};

/// Running totals across every window a pipeline has processed
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineStats {
    pub windows_processed: u64,
    pub rows_aggregated: u64,
    pub rows_inserted: u64,
    pub rows_combined: u64,
    pub rows_rejected: u64,
    pub rows_skipped: u64,
}

impl PipelineStats {
    fn record(&mut self, report: &MergeReport) {
        self.windows_processed += 1;
        self.rows_aggregated += report.rows_total as u64;
        self.rows_inserted += report.inserted.len() as u64;
        self.rows_combined += report.combined.len() as u64;
        self.rows_rejected += report.rejected.len() as u64;
        self.rows_skipped += report.skipped.len() as u64;
    }
}

/// Result of one window
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub merge: MergeReport,
    /// Snapshot taken right after the merge, when reporting is enabled
    pub summary: Option<SummaryReport>,
}

/// Aggregate-then-merge loop over a window schedule
pub struct RollupPipeline<A> {
    aggregator: A,
    engine: MergeEngine,
    report_each_window: bool,
    stats: Arc<RwLock<PipelineStats>>,
}

impl<A: BatchAggregator> RollupPipeline<A> {
    pub fn new(aggregator: A, engine: MergeEngine) -> Self {
        Self {
            aggregator,
            engine,
            report_each_window: false,
            stats: Arc::new(RwLock::new(PipelineStats::default())),
        }
    }

    /// Take a reporting snapshot after every window
    pub fn with_reporting(mut self, enabled: bool) -> Self {
        self.report_each_window = enabled;
        self
    }

    pub fn engine(&self) -> &MergeEngine {
        &self.engine
    }

    pub fn aggregator(&self) -> &A {
        &self.aggregator
    }

    /// Get a snapshot of the running totals
    pub fn stats(&self) -> PipelineStats {
        self.stats.read().clone()
    }

    /// Process every window of `schedule` in order
    pub async fn run(&self, schedule: &WindowSchedule) -> Result<Vec<BatchOutcome>> {
        self.run_with_cancel(schedule, &CancellationToken::new())
            .await
    }

    /// Process `schedule` in order until it ends or `cancel` fires
    ///
    /// The first error stops the run and is returned as is; windows after it
    /// are not attempted.
    pub async fn run_with_cancel(
        &self,
        schedule: &WindowSchedule,
        cancel: &CancellationToken,
    ) -> Result<Vec<BatchOutcome>> {
        self.run_each(schedule, cancel, |_| {}).await
    }

    /// Like [`run_with_cancel`](Self::run_with_cancel), handing each window's
    /// outcome to `on_window` as soon as it is merged
    #[instrument(skip_all, fields(windows = schedule.len()))]
    pub async fn run_each<F>(
        &self,
        schedule: &WindowSchedule,
        cancel: &CancellationToken,
        mut on_window: F,
    ) -> Result<Vec<BatchOutcome>>
    where
        F: FnMut(&BatchOutcome),
    {
        for (previous, next) in schedule.discontinuities() {
            warn!(%previous, %next, "Window schedule is not contiguous");
        }

        let mut outcomes = Vec::with_capacity(schedule.len());
        for window in schedule {
            if cancel.is_cancelled() {
                info!(%window, "Run cancelled before window");
                break;
            }
            let outcome = self.run_window(*window, cancel).await?;
            on_window(&outcome);
            let stop = outcome.merge.cancelled;
            outcomes.push(outcome);
            if stop {
                break;
            }
        }

        let stats = self.stats();
        info!(
            windows = stats.windows_processed,
            inserted = stats.rows_inserted,
            combined = stats.rows_combined,
            rejected = stats.rows_rejected,
            "Pipeline run finished"
        );

        Ok(outcomes)
    }

    /// Aggregate and merge a single window
    #[instrument(skip_all, fields(window = %window))]
    pub async fn run_window(
        &self,
        window: WindowBounds,
        cancel: &CancellationToken,
    ) -> Result<BatchOutcome> {
        let rows = self.aggregator.aggregate(&window).await?;
        let merge = self
            .engine
            .merge_batch_with_cancel(window, rows, cancel)
            .await?;
        self.stats.write().record(&merge);

        let summary = if self.report_each_window {
            Some(MetricsReporter::snapshot(self.engine.store().as_ref()).await?)
        } else {
            None
        };

        Ok(BatchOutcome { merge, summary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::{CounterAggregate, EventLogAggregator};
    use crate::config::EngineConfig;
    use crate::error::{AggregatorError, AggregatorResult, EngineError};
    use crate::state::MemorySummaryStore;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use review_rollup_types::{BatchAggregateRow, ReviewEvent};

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2018, 2, day, 12, 0, 0).unwrap()
    }

    fn midnight(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2018, 2, day, 0, 0, 0).unwrap()
    }

    async fn pipeline(events: Vec<ReviewEvent>) -> RollupPipeline<EventLogAggregator> {
        let engine = MergeEngine::attach(Arc::new(MemorySummaryStore::new()), EngineConfig::default())
            .await
            .unwrap();
        RollupPipeline::new(EventLogAggregator::new(events, CounterAggregate::Sum), engine)
    }

    #[tokio::test]
    async fn test_run_merges_windows_in_order() {
        let pipeline = pipeline(vec![
            ReviewEvent::new("a", 4.0, 10, 0, 0, at(1)),
            ReviewEvent::new("a", 2.0, 6, 0, 0, at(2)),
            ReviewEvent::new("b", 5.0, 1, 0, 0, at(2)),
        ])
        .await
        .with_reporting(true);

        let schedule =
            WindowSchedule::tumbling(midnight(1), midnight(3), chrono::Duration::days(1)).unwrap();
        let outcomes = pipeline.run(&schedule).await.unwrap();

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].merge.inserted, vec!["a"]);
        assert_eq!(outcomes[1].merge.combined, vec!["a"]);
        assert_eq!(outcomes[1].merge.inserted, vec!["b"]);

        let summary = outcomes[1].summary.as_ref().unwrap();
        assert_eq!(summary.totals.row_count, 2);
        assert_eq!(summary.totals.sum_useful, 17);

        let stats = pipeline.stats();
        assert_eq!(stats.windows_processed, 2);
        assert_eq!(stats.rows_aggregated, 3);
        assert_eq!(stats.rows_inserted, 2);
        assert_eq!(stats.rows_combined, 1);
    }

    #[tokio::test]
    async fn test_run_each_sees_every_window_as_it_lands() {
        let pipeline = pipeline(vec![
            ReviewEvent::new("a", 4.0, 1, 0, 0, at(1)),
            ReviewEvent::new("b", 3.0, 1, 0, 0, at(2)),
        ])
        .await;
        let schedule =
            WindowSchedule::tumbling(midnight(1), midnight(3), chrono::Duration::days(1)).unwrap();

        let mut seen = Vec::new();
        let outcomes = pipeline
            .run_each(&schedule, &CancellationToken::new(), |outcome| {
                seen.push((outcome.merge.window, outcome.merge.inserted.clone()));
            })
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 2);
        assert_eq!(
            seen,
            vec![
                (WindowBounds::new(midnight(1), midnight(2)), vec!["a".to_string()]),
                (WindowBounds::new(midnight(2), midnight(3)), vec!["b".to_string()]),
            ]
        );
    }

    #[tokio::test]
    async fn test_cancelled_run_stops() {
        let pipeline = pipeline(vec![ReviewEvent::new("a", 4.0, 1, 0, 0, at(1))]).await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let schedule =
            WindowSchedule::tumbling(midnight(1), midnight(3), chrono::Duration::days(1)).unwrap();
        let outcomes = pipeline.run_with_cancel(&schedule, &cancel).await.unwrap();

        assert!(outcomes.is_empty());
        assert_eq!(pipeline.stats().windows_processed, 0);
    }

    struct BrokenSource;

    #[async_trait]
    impl BatchAggregator for BrokenSource {
        async fn aggregate(&self, _window: &WindowBounds) -> AggregatorResult<Vec<BatchAggregateRow>> {
            Err(AggregatorError::Source {
                details: "connection reset".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_aggregator_failure_propagates() {
        let engine = MergeEngine::attach(Arc::new(MemorySummaryStore::new()), EngineConfig::default())
            .await
            .unwrap();
        let pipeline = RollupPipeline::new(BrokenSource, engine);

        let schedule =
            WindowSchedule::tumbling(midnight(1), midnight(2), chrono::Duration::days(1)).unwrap();
        let err = pipeline.run(&schedule).await.unwrap_err();

        assert!(matches!(err, EngineError::Aggregator(AggregatorError::Source { .. })));
        assert_eq!(pipeline.stats().windows_processed, 0);
    }
}
