//! Prometheus metrics for the rollup processor
//!
//! Counters for merged batches and per-row outcomes, plus a histogram of
//! batch merge latency. Names follow Prometheus conventions and are rendered
//! in the text exposition format by [`MetricsRegistry::encode`].

mod labels;
mod registry;
mod rollup;

pub use labels::{RowOutcomeLabel, RowOutcomeLabels};
pub use registry::{MetricsRegistry, METRIC_PREFIX};
pub use rollup::RollupMetrics;

use thiserror::Error;

/// Errors that can occur in the metrics subsystem
#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Metric encoding error: {0}")]
    EncodingError(String),
}

pub type Result<T> = std::result::Result<T, MetricsError>;
