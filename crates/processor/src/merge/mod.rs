//! Incremental merge of batch aggregates into the summary table
//!
//! - **policy**: how an existing summary and a batch row combine
//! - **engine**: applies a whole batch with per-entity isolation
//! - **report**: what a batch merge did

pub mod engine;
pub mod policy;
pub mod report;

pub use engine::MergeEngine;
pub use policy::{CombinePolicy, CounterMode, RatingMode, RatingRange};
pub use report::{MergeReport, RowFailure, RowRejection};
