//! Incremental review rollup processor
//!
//! This crate maintains a per-entity review summary table that is updated
//! one time window at a time: raw review events for a window are aggregated
//! per entity, and each batch row is either inserted as a new summary or
//! combined with the existing one.

pub mod aggregation;
pub mod config;
pub mod error;
pub mod merge;
pub mod metrics;
pub mod pipeline;
pub mod reporter;
pub mod state;
pub mod window;

// Re-export commonly used types
pub use aggregation::{BatchAggregator, CounterAggregate, EntityAccumulator, EventLogAggregator};

pub use config::{EngineConfig, StoreBackend, StoreConfig};

pub use error::{
    AggregatorError, EngineError, Result as EngineResult, StoreError, WindowError,
};

pub use merge::{
    CombinePolicy, CounterMode, MergeEngine, MergeReport, RatingMode, RatingRange, RowFailure,
    RowRejection,
};

pub use metrics::{MetricsRegistry, RollupMetrics};

pub use pipeline::{BatchOutcome, PipelineStats, RollupPipeline};

pub use reporter::{DailyRow, MetricsReporter, SummaryReport, TotalsRow};

pub use state::{MemorySummaryStore, SledConfig, SledSummaryStore, StoreMetadata, SummaryStore};

pub use window::{WindowBounds, WindowSchedule};
