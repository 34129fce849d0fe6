//! Error types for the rollup processor
//!
//! Each layer (windows, batch aggregation, summary stores, merge engine) has
//! its own error enum. `EngineError` is what the merge engine and the
//! pipeline surface to the driver.

use chrono::{DateTime, Utc};
use review_rollup_types::ValidationError;
use thiserror::Error;

use crate::merge::{CombinePolicy, MergeReport};
use crate::window::WindowBounds;

/// Main engine error type
#[derive(Error, Debug)]
pub enum EngineError {
    /// The batch window starts before a window that was already merged
    #[error("out-of-order window: {window} starts before last merged window {last_merged}")]
    OutOfOrderWindow {
        window: WindowBounds,
        last_merged: WindowBounds,
    },

    /// The store was built up with a different combine policy
    #[error("combine policy mismatch: store was merged with {stored}, engine is configured with {configured}")]
    PolicyMismatch {
        stored: CombinePolicy,
        configured: CombinePolicy,
    },

    /// Summary store failure (collaborator)
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Batch aggregator failure (collaborator)
    #[error("aggregator error: {0}")]
    Aggregator(#[from] AggregatorError),

    /// A store failure stopped a batch part way through
    #[error(
        "batch {} aborted after {} applied rows: {source}",
        .report.window,
        .report.applied()
    )]
    BatchAborted {
        report: Box<MergeReport>,
        source: StoreError,
    },

    /// Window specification errors
    #[error("window error: {0}")]
    Window(#[from] WindowError),

    /// Configuration errors
    #[error("configuration error: {source}")]
    Configuration {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Report serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Wrap a configuration validation failure
    pub fn configuration(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        EngineError::Configuration {
            source: source.into(),
        }
    }
}

/// Window specification errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WindowError {
    /// Window end is not after its start
    #[error("invalid window bounds: start {start} must be before end {end}")]
    InvalidBounds {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// Windows in a schedule are not in non-decreasing start order
    #[error("window schedule out of order: {next} starts before {previous}")]
    NotAscending {
        previous: WindowBounds,
        next: WindowBounds,
    },

    /// Tumbling window size is invalid
    #[error("invalid window size: {size_ms}ms, must be greater than 0")]
    InvalidWindowSize { size_ms: i64 },

    /// Textual window specification could not be parsed
    #[error("unparseable window '{input}': {reason}")]
    Parse { input: String, reason: String },
}

/// Summary store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// The row was rejected; the stored value for the key is unchanged
    #[error("row rejected: {0}")]
    Validation(#[from] ValidationError),

    /// Storage engine failure
    #[error("storage error in {backend}: {details}")]
    Storage {
        backend: &'static str,
        details: String,
    },

    /// Encoding a row or metadata failed
    #[error("serialization failed for key '{key}': {reason}")]
    SerializationFailed { key: String, reason: String },

    /// Decoding a row or metadata failed
    #[error("deserialization failed for key '{key}': {reason}")]
    DeserializationFailed { key: String, reason: String },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Whether this failure is a per-row rejection rather than a store fault
    pub fn is_validation(&self) -> bool {
        matches!(self, StoreError::Validation(_))
    }
}

/// Batch aggregator errors
#[derive(Error, Debug)]
pub enum AggregatorError {
    /// A raw event line could not be decoded
    #[error("malformed event at line {line}: {reason}")]
    MalformedEvent { line: usize, reason: String },

    /// The raw event source failed
    #[error("event source failure: {details}")]
    Source { details: String },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Result type alias for window operations
pub type WindowResult<T> = std::result::Result<T, WindowError>;

/// Result type alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type alias for aggregator operations
pub type AggregatorResult<T> = std::result::Result<T, AggregatorError>;

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::Storage {
            backend: "sled",
            details: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_window_error_display() {
        let err = WindowError::InvalidWindowSize { size_ms: 0 };
        assert!(err.to_string().contains("invalid window size"));
    }

    #[test]
    fn test_store_error_validation_flag() {
        let err: StoreError = ValidationError::EmptyEntityId.into();
        assert!(err.is_validation());

        let err = StoreError::Storage {
            backend: "sled",
            details: "disk full".to_string(),
        };
        assert!(!err.is_validation());
    }

    #[test]
    fn test_aggregator_error_display() {
        let err = AggregatorError::MalformedEvent {
            line: 7,
            reason: "missing field".to_string(),
        };
        assert!(err.to_string().contains("line 7"));
    }

    #[test]
    fn test_engine_error_from_window_error() {
        let start = Utc.with_ymd_and_hms(2018, 2, 1, 0, 0, 0).unwrap();
        let window_err = WindowError::InvalidBounds { start, end: start };
        let engine_err: EngineError = window_err.into();
        assert!(matches!(engine_err, EngineError::Window(_)));
    }
}
