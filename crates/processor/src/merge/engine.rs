//! Merge engine
//!
//! Applies one window's batch rows to a [`SummaryStore`]. Each row takes the
//! insert branch when its entity has no summary yet and the combine branch
//! otherwise. Rows of one batch never share an entity id, so they are merged
//! concurrently; batches themselves are applied one at a time.

use futures::stream::{self, StreamExt};
use review_rollup_types::{BatchAggregateRow, EntitySummary, ValidationError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::policy::CombinePolicy;
use super::report::{MergeReport, RowFailure, RowRejection};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result, StoreError, StoreResult};
use crate::metrics::RollupMetrics;
use crate::state::{StoreMetadata, SummaryStore};
use crate::window::WindowBounds;

/// Outcome of merging a single row
enum RowOutcome {
    Inserted,
    Combined,
    Rejected(ValidationError),
    Skipped,
    Failed(StoreError),
}

/// Incremental merge engine bound to one summary store
///
/// Several engines may share a store. They hold the store's
/// [`batch_lock`](SummaryStore::batch_lock) for each batch, so batches from
/// different engines are applied one after another.
///
/// ## Example
///
/// ```rust,no_run
/// use chrono::{TimeZone, Utc};
/// use processor::config::EngineConfig;
/// use processor::merge::MergeEngine;
/// use processor::state::MemorySummaryStore;
/// use processor::window::WindowBounds;
/// use review_rollup_types::BatchAggregateRow;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let store = Arc::new(MemorySummaryStore::new());
///     let engine = MergeEngine::attach(store, EngineConfig::default()).await?;
///
///     let window = WindowBounds::new(
///         Utc.with_ymd_and_hms(2018, 2, 1, 0, 0, 0).unwrap(),
///         Utc.with_ymd_and_hms(2018, 2, 2, 0, 0, 0).unwrap(),
///     );
///     let rows = vec![BatchAggregateRow::new(
///         "biz-1",
///         4.0,
///         (10, 2, 1),
///         Utc.with_ymd_and_hms(2018, 2, 1, 9, 30, 0).unwrap(),
///         3,
///     )];
///
///     let report = engine.merge_batch(window, rows).await?;
///     println!("{report}");
///     Ok(())
/// }
/// ```
pub struct MergeEngine {
    store: Arc<dyn SummaryStore>,
    config: EngineConfig,
    policy: CombinePolicy,
    metrics: Option<RollupMetrics>,
}

impl MergeEngine {
    /// Bind an engine to a store
    ///
    /// The first engine attached to a store records its combine policy in the
    /// store metadata. Attaching with a different policy afterwards fails with
    /// [`EngineError::PolicyMismatch`].
    pub async fn attach(store: Arc<dyn SummaryStore>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let policy = config.policy();

        let mut metadata = store.metadata().await?;
        match metadata.policy {
            Some(stored) if stored != policy => {
                return Err(EngineError::PolicyMismatch {
                    stored,
                    configured: policy,
                });
            }
            Some(_) => {
                debug!(%policy, "Store already bound to engine policy");
            }
            None => {
                metadata.policy = Some(policy);
                store.put_metadata(&metadata).await?;
                info!(%policy, "Bound store to combine policy");
            }
        }

        Ok(Self {
            store,
            config,
            policy,
            metrics: None,
        })
    }

    /// Record batch outcomes into `metrics`
    pub fn with_metrics(mut self, metrics: RollupMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// The active combine policy
    pub fn policy(&self) -> CombinePolicy {
        self.policy
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The store this engine merges into
    pub fn store(&self) -> &Arc<dyn SummaryStore> {
        &self.store
    }

    /// Merge one batch to completion
    pub async fn merge_batch(
        &self,
        window: WindowBounds,
        rows: Vec<BatchAggregateRow>,
    ) -> Result<MergeReport> {
        self.merge_batch_with_cancel(window, rows, &CancellationToken::new())
            .await
    }

    /// Merge one batch, stopping early if `cancel` fires
    ///
    /// A cancelled merge stops starting new rows. Rows already applied stay
    /// applied and the rest are reported as skipped; this is not an error.
    ///
    /// # Errors
    ///
    /// * `OutOfOrderWindow` - the window starts before the last merged window;
    ///   nothing was touched
    /// * `BatchAborted` - a store failure stopped the batch, or recording its
    ///   progress failed after rows were applied; the report says which
    ///   entities were applied
    /// * `Store` - reading the store metadata failed, or writing it failed
    ///   with nothing applied
    #[instrument(skip_all, fields(window = %window, rows = rows.len()))]
    pub async fn merge_batch_with_cancel(
        &self,
        window: WindowBounds,
        rows: Vec<BatchAggregateRow>,
        cancel: &CancellationToken,
    ) -> Result<MergeReport> {
        let _guard = self.store.batch_lock().lock().await;
        let started = Instant::now();

        let mut metadata = self.store.metadata().await?;
        if self.config.enforce_window_order {
            if let Some(last_merged) = metadata.last_window {
                if window.start < last_merged.start {
                    warn!(%last_merged, "Rejecting out-of-order window");
                    return Err(EngineError::OutOfOrderWindow {
                        window,
                        last_merged,
                    });
                }
            }
        }

        let mut report = MergeReport::new(window, rows.len());
        let aborted = AtomicBool::new(false);

        let outcomes: Vec<(String, RowOutcome)> = stream::iter(rows)
            .map(|row| {
                let aborted = &aborted;
                async move {
                    let entity_id = row.entity_id.clone();
                    if cancel.is_cancelled() || aborted.load(Ordering::Acquire) {
                        return (entity_id, RowOutcome::Skipped);
                    }
                    let outcome = self.merge_row(row).await;
                    if matches!(outcome, RowOutcome::Failed(_)) {
                        aborted.store(true, Ordering::Release);
                    }
                    (entity_id, outcome)
                }
            })
            .buffer_unordered(self.config.parallelism)
            .collect()
            .await;

        let mut first_failure = None;
        for (entity_id, outcome) in outcomes {
            match outcome {
                RowOutcome::Inserted => report.inserted.push(entity_id),
                RowOutcome::Combined => report.combined.push(entity_id),
                RowOutcome::Rejected(err) => {
                    warn!(%entity_id, error = %err, "Rejected batch row");
                    report.rejected.push(RowRejection {
                        entity_id,
                        reason: err.to_string(),
                    });
                }
                RowOutcome::Skipped => report.skipped.push(entity_id),
                RowOutcome::Failed(err) => {
                    report.failed.push(RowFailure {
                        entity_id,
                        error: err.to_string(),
                    });
                    first_failure.get_or_insert(err);
                }
            }
        }
        report.cancelled = cancel.is_cancelled() && !report.skipped.is_empty();
        report.sort();

        // Partially merged windows still advance the watermark, so re-running
        // the remainder with the same window stays in order.
        if report.applied() > 0 || first_failure.is_none() {
            metadata.last_window = Some(metadata.last_window.map_or(window, |w| w.max(window)));
        }
        if report.is_complete() {
            metadata.batches_merged += 1;
        }
        report.elapsed = started.elapsed();

        if let Some(metrics) = &self.metrics {
            metrics.record_batch(&report);
        }

        if let Some(source) = first_failure {
            if let Err(err) = self.store.put_metadata(&metadata).await {
                warn!(error = %err, "Failed to record window after aborted batch");
            }
            warn!(
                applied = report.applied(),
                failed = report.failed.len(),
                skipped = report.skipped.len(),
                "Batch aborted by store failure"
            );
            return Err(EngineError::BatchAborted {
                report: Box::new(report),
                source,
            });
        }

        if let Err(source) = self.record_progress(&metadata).await {
            if report.applied() == 0 {
                return Err(source.into());
            }
            warn!(
                applied = report.applied(),
                error = %source,
                "Failed to record progress after applying rows"
            );
            return Err(EngineError::BatchAborted {
                report: Box::new(report),
                source,
            });
        }

        info!(
            inserted = report.inserted.len(),
            combined = report.combined.len(),
            rejected = report.rejected.len(),
            skipped = report.skipped.len(),
            cancelled = report.cancelled,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Merged batch"
        );

        Ok(report)
    }

    async fn record_progress(&self, metadata: &StoreMetadata) -> StoreResult<()> {
        self.store.put_metadata(metadata).await?;
        self.store.flush().await
    }

    async fn merge_row(&self, row: BatchAggregateRow) -> RowOutcome {
        if let Err(err) = self.check_row(&row) {
            return RowOutcome::Rejected(err);
        }

        let existing = match self.store.get(&row.entity_id).await {
            Ok(existing) => existing,
            Err(err) => return RowOutcome::Failed(err),
        };

        let (summary, outcome) = match existing {
            None => {
                debug!(entity_id = %row.entity_id, "Inserting new summary");
                (EntitySummary::from(row), RowOutcome::Inserted)
            }
            Some(existing) => match self.policy.combine(&existing, &row) {
                Ok(merged) => {
                    debug!(
                        entity_id = %row.entity_id,
                        previous = existing.rating,
                        rating = merged.rating,
                        "Combining with existing summary"
                    );
                    (merged, RowOutcome::Combined)
                }
                Err(err) => return RowOutcome::Rejected(err),
            },
        };

        match self.store.upsert(summary).await {
            Ok(()) => outcome,
            Err(StoreError::Validation(err)) => RowOutcome::Rejected(err),
            Err(err) => RowOutcome::Failed(err),
        }
    }

    fn check_row(&self, row: &BatchAggregateRow) -> std::result::Result<(), ValidationError> {
        row.validate()?;
        if let Some(range) = &self.config.rating_range {
            range.check(&row.entity_id, row.rating)?;
        }
        Ok(())
    }
}
