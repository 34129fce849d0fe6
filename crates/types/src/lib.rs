//! Core types and data models for review rollups
//!
//! This crate provides the row shapes shared by the batch aggregator, the
//! summary stores and the merge engine.

pub mod errors;
pub mod events;
pub mod summary;

pub use errors::{ValidationError, ValidationResult};
pub use events::ReviewEvent;
pub use summary::{BatchAggregateRow, EntitySummary};
