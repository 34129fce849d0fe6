//! Merge engine metrics

use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};

use super::labels::{RowOutcomeLabel, RowOutcomeLabels};
use super::registry::MetricsRegistry;
use crate::merge::MergeReport;

/// Counters and latency for batch merges
///
/// Cloning is cheap; every clone updates the same underlying metrics.
#[derive(Clone)]
pub struct RollupMetrics {
    batches_merged: Counter,
    batches_aborted: Counter,
    batches_cancelled: Counter,
    rows: Family<RowOutcomeLabels, Counter>,
    batch_duration: Histogram,
    registry: MetricsRegistry,
}

impl RollupMetrics {
    /// Create the metrics and register them in `registry`
    pub fn new(registry: &MetricsRegistry) -> Self {
        let metrics = Self {
            batches_merged: Counter::default(),
            batches_aborted: Counter::default(),
            batches_cancelled: Counter::default(),
            rows: Family::default(),
            batch_duration: Histogram::new(exponential_buckets(0.001, 2.0, 16)),
            registry: registry.clone(),
        };

        registry.register(
            "batches_merged",
            "Batches merged to completion",
            metrics.batches_merged.clone(),
        );
        registry.register(
            "batches_aborted",
            "Batches stopped by a store failure",
            metrics.batches_aborted.clone(),
        );
        registry.register(
            "batches_cancelled",
            "Batches stopped by cancellation",
            metrics.batches_cancelled.clone(),
        );
        registry.register("rows", "Batch rows by merge outcome", metrics.rows.clone());
        registry.register(
            "batch_duration_seconds",
            "Wall time of one batch merge",
            metrics.batch_duration.clone(),
        );

        metrics
    }

    /// Metrics registered in a fresh private registry
    pub fn standalone() -> Self {
        Self::new(&MetricsRegistry::new())
    }

    /// Record a finished `merge_batch` call
    pub fn record_batch(&self, report: &MergeReport) {
        if !report.failed.is_empty() {
            self.batches_aborted.inc();
        } else if report.cancelled {
            self.batches_cancelled.inc();
        } else {
            self.batches_merged.inc();
        }

        self.add_rows(RowOutcomeLabel::Inserted, report.inserted.len());
        self.add_rows(RowOutcomeLabel::Combined, report.combined.len());
        self.add_rows(RowOutcomeLabel::Rejected, report.rejected.len());
        self.add_rows(RowOutcomeLabel::Skipped, report.skipped.len());
        self.add_rows(RowOutcomeLabel::Failed, report.failed.len());

        self.batch_duration.observe(report.elapsed.as_secs_f64());
    }

    fn add_rows(&self, outcome: RowOutcomeLabel, count: usize) {
        if count > 0 {
            self.rows
                .get_or_create(&outcome.into())
                .inc_by(count as u64);
        }
    }

    pub fn batches_merged(&self) -> u64 {
        self.batches_merged.get()
    }

    pub fn batches_aborted(&self) -> u64 {
        self.batches_aborted.get()
    }

    pub fn batches_cancelled(&self) -> u64 {
        self.batches_cancelled.get()
    }

    /// Rows recorded with the given outcome
    pub fn rows(&self, outcome: RowOutcomeLabel) -> u64 {
        self.rows.get_or_create(&outcome.into()).get()
    }

    /// Text exposition of the registry these metrics live in
    pub fn encode(&self) -> super::Result<String> {
        self.registry.encode()
    }
}
