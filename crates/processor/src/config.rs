//! Configuration types for the rollup processor
//!
//! This module provides configuration structures for the merge engine and
//! the summary store backing it.

use crate::error::{EngineError, Result, StoreResult};
use crate::merge::{CombinePolicy, CounterMode, RatingMode, RatingRange};
use crate::state::{MemorySummaryStore, SledConfig, SledSummaryStore, SummaryStore};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Merge engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How counters combine across batches
    #[serde(default)]
    pub counter_mode: CounterMode,

    /// How ratings combine across batches
    #[serde(default)]
    pub rating_mode: RatingMode,

    /// Maximum rows of one batch merged concurrently
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,

    /// Reject batches whose window starts before the last merged window
    #[serde(default = "default_true")]
    pub enforce_window_order: bool,

    /// Accepted rating interval for batch rows; `None` accepts any finite rating
    #[serde(default = "default_rating_range")]
    pub rating_range: Option<RatingRange>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            counter_mode: CounterMode::default(),
            rating_mode: RatingMode::default(),
            parallelism: default_parallelism(),
            enforce_window_order: true,
            rating_range: default_rating_range(),
        }
    }
}

impl EngineConfig {
    /// Configuration with the given combine policy and defaults elsewhere
    pub fn with_policy(policy: CombinePolicy) -> Self {
        Self {
            counter_mode: policy.counter_mode,
            rating_mode: policy.rating_mode,
            ..Default::default()
        }
    }

    /// The combine policy this configuration selects
    pub fn policy(&self) -> CombinePolicy {
        CombinePolicy::new(self.counter_mode, self.rating_mode)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.parallelism == 0 {
            return Err(EngineError::configuration(
                "parallelism must be greater than 0",
            ));
        }

        if let Some(range) = &self.rating_range {
            if !range.min.is_finite() || !range.max.is_finite() || range.min > range.max {
                return Err(EngineError::configuration(format!(
                    "rating_range must be finite with min <= max, got [{}, {}]",
                    range.min, range.max
                )));
            }
        }

        Ok(())
    }
}

/// Summary store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store backend type
    #[serde(default)]
    pub backend: StoreBackend,

    /// Database directory (for the sled backend)
    pub path: Option<PathBuf>,

    /// Sled page cache size in bytes
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity_bytes: u64,

    /// Flush the sled log every N upserts
    #[serde(default = "default_flush_every")]
    pub flush_every: u64,
}

/// Summary store backend type
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// In-memory table, gone when the process exits
    #[default]
    Memory,
    /// Persistent sled database
    Sled,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            path: None,
            cache_capacity_bytes: default_cache_capacity(),
            flush_every: default_flush_every(),
        }
    }
}

impl StoreConfig {
    /// Persistent store rooted at `path`
    pub fn sled(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: StoreBackend::Sled,
            path: Some(path.into()),
            ..Default::default()
        }
    }

    /// Validate store configuration
    pub fn validate(&self) -> Result<()> {
        if matches!(self.backend, StoreBackend::Sled) && self.path.is_none() {
            return Err(EngineError::configuration("sled store backend requires path"));
        }

        if self.flush_every == 0 {
            return Err(EngineError::configuration(
                "flush_every must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Open the configured store
    pub async fn open(&self) -> StoreResult<Arc<dyn SummaryStore>> {
        match (self.backend, &self.path) {
            (StoreBackend::Sled, Some(path)) => {
                let config = SledConfig::new(path)
                    .with_cache_capacity(self.cache_capacity_bytes)
                    .with_flush_every(self.flush_every);
                Ok(Arc::new(SledSummaryStore::open(config).await?))
            }
            (StoreBackend::Sled, None) => Ok(Arc::new(SledSummaryStore::temporary().await?)),
            (StoreBackend::Memory, _) => Ok(Arc::new(MemorySummaryStore::new())),
        }
    }
}

// Default value functions
fn default_parallelism() -> usize {
    4
}

fn default_true() -> bool {
    true
}

fn default_rating_range() -> Option<RatingRange> {
    Some(RatingRange::default())
}

fn default_cache_capacity() -> u64 {
    64 * 1024 * 1024
}

fn default_flush_every() -> u64 {
    1000
}
