//! Review rollup CLI library
//!
//! Commands and output formatting behind the `review-rollup` binary.

pub mod commands;
pub mod output;

use thiserror::Error;

/// CLI error type
#[derive(Error, Debug)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] review_rollup_config::ConfigError),

    #[error("{0}")]
    Engine(#[from] processor::EngineError),

    #[error("event source error: {0}")]
    Aggregator(#[from] processor::AggregatorError),

    #[error("store error: {0}")]
    Store(#[from] processor::StoreError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CliResult<T> = std::result::Result<T, CliError>;
