//! Sled-based persistent summary store
//!
//! Rows live under `summary:<entity_id>` keys and the store metadata under
//! `meta:store`, both bincode-encoded. A sled `insert` replaces a key's value
//! atomically, which gives the per-key atomicity the merge engine relies on.

use async_trait::async_trait;
use parking_lot::RwLock;
use review_rollup_types::EntitySummary;
use sled::Db;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, trace};

use super::backend::{StoreMetadata, SummaryStore};
use crate::error::{StoreError, StoreResult};

const ROW_PREFIX: &[u8] = b"summary:";
const METADATA_KEY: &[u8] = b"meta:store";

/// Statistics for the Sled store
#[derive(Debug, Clone, Default)]
pub struct SledStoreStats {
    /// Number of get operations
    pub get_count: u64,
    /// Number of accepted upserts
    pub upsert_count: u64,
    /// Number of upserts rejected by validation
    pub rejected_count: u64,
    /// Number of flush operations
    pub flush_count: u64,
    /// Total encoded bytes written
    pub bytes_written: u64,
}

/// Configuration for the Sled store
#[derive(Debug, Clone)]
pub struct SledConfig {
    /// Path to the database directory
    pub path: PathBuf,
    /// Cache size in bytes (default: 64MB)
    pub cache_capacity: u64,
    /// Flush every N upserts (default: 1000)
    pub flush_every: u64,
    /// Discard the database when dropped
    pub temporary: bool,
}

impl Default for SledConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("rollup-state"),
            cache_capacity: 64 * 1024 * 1024,
            flush_every: 1000,
            temporary: false,
        }
    }
}

impl SledConfig {
    /// Create a new configuration with the given path
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    /// Set the cache capacity
    pub fn with_cache_capacity(mut self, capacity: u64) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Set the flush interval
    pub fn with_flush_every(mut self, count: u64) -> Self {
        self.flush_every = count;
        self
    }
}

/// Sled-based persistent summary store
///
/// ## Example
///
/// ```rust,no_run
/// use processor::state::{SledConfig, SledSummaryStore, SummaryStore};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let store = SledSummaryStore::open(SledConfig::new("/var/lib/rollup/state")).await?;
///
///     println!("{} entities summarized", store.len().await?);
///
///     store.flush().await?;
///     Ok(())
/// }
/// ```
pub struct SledSummaryStore {
    db: Arc<Db>,
    config: SledConfig,
    stats: Arc<RwLock<SledStoreStats>>,
    op_counter: Arc<AtomicU64>,
    batch_lock: Mutex<()>,
}

impl SledSummaryStore {
    /// Open a Sled database with the given configuration
    pub async fn open(config: SledConfig) -> StoreResult<Self> {
        info!("Opening Sled summary store at {:?}", config.path);

        if !config.temporary {
            if let Some(parent) = config.path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
        }

        let mut sled_config = sled::Config::new().cache_capacity(config.cache_capacity);
        sled_config = if config.temporary {
            // sled picks a unique scratch path for temporary databases
            sled_config.temporary(true)
        } else {
            sled_config.path(&config.path)
        };

        let db = sled_config
            .open()
            .map_err(|e| StoreError::Storage {
                backend: "sled",
                details: format!("Failed to open database: {}", e),
            })?;

        info!(
            "Sled summary store opened, {} rows",
            db.scan_prefix(ROW_PREFIX).count()
        );

        Ok(Self {
            db: Arc::new(db),
            config,
            stats: Arc::new(RwLock::new(SledStoreStats::default())),
            op_counter: Arc::new(AtomicU64::new(0)),
            batch_lock: Mutex::new(()),
        })
    }

    /// Create a temporary store for testing, discarded on drop
    pub async fn temporary() -> StoreResult<Self> {
        let config = SledConfig {
            temporary: true,
            ..SledConfig::default()
        };
        Self::open(config).await
    }

    /// Get a snapshot of current statistics
    pub fn stats(&self) -> SledStoreStats {
        self.stats.read().clone()
    }

    /// Path of the underlying database
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    fn row_key(entity_id: &str) -> Vec<u8> {
        let mut key = Vec::with_capacity(ROW_PREFIX.len() + entity_id.len());
        key.extend_from_slice(ROW_PREFIX);
        key.extend_from_slice(entity_id.as_bytes());
        key
    }

    fn decode_row(key: &[u8], bytes: &[u8]) -> StoreResult<EntitySummary> {
        bincode::deserialize(bytes).map_err(|e| StoreError::DeserializationFailed {
            key: String::from_utf8_lossy(key).into_owned(),
            reason: e.to_string(),
        })
    }

    /// Flush when the configured number of upserts has accumulated
    async fn maybe_flush(&self) -> StoreResult<()> {
        let count = self.op_counter.fetch_add(1, Ordering::Relaxed) + 1;
        if count >= self.config.flush_every {
            self.op_counter.store(0, Ordering::Relaxed);
            self.flush().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl SummaryStore for SledSummaryStore {
    async fn get(&self, entity_id: &str) -> StoreResult<Option<EntitySummary>> {
        trace!(entity_id, "Getting summary row from Sled");

        let key = Self::row_key(entity_id);
        let value = self.db.get(&key)?;
        self.stats.write().get_count += 1;

        value.map(|bytes| Self::decode_row(&key, &bytes)).transpose()
    }

    async fn upsert(&self, summary: EntitySummary) -> StoreResult<()> {
        trace!(entity_id = %summary.entity_id, "Upserting summary row into Sled");

        if let Err(err) = summary.validate() {
            self.stats.write().rejected_count += 1;
            return Err(err.into());
        }

        let key = Self::row_key(&summary.entity_id);
        let bytes = bincode::serialize(&summary).map_err(|e| StoreError::SerializationFailed {
            key: summary.entity_id.clone(),
            reason: e.to_string(),
        })?;
        let written = bytes.len() as u64;
        self.db.insert(key, bytes)?;

        {
            let mut stats = self.stats.write();
            stats.upsert_count += 1;
            stats.bytes_written += written;
        }

        self.maybe_flush().await
    }

    async fn scan(&self) -> StoreResult<Vec<EntitySummary>> {
        trace!("Scanning Sled summary rows");

        self.db
            .scan_prefix(ROW_PREFIX)
            .map(|entry| {
                let (key, value) = entry?;
                Self::decode_row(&key, &value)
            })
            .collect()
    }

    async fn remove(&self, entity_id: &str) -> StoreResult<Option<EntitySummary>> {
        trace!(entity_id, "Removing summary row from Sled");

        let key = Self::row_key(entity_id);
        self.db
            .remove(&key)?
            .map(|bytes| Self::decode_row(&key, &bytes))
            .transpose()
    }

    async fn metadata(&self) -> StoreResult<StoreMetadata> {
        match self.db.get(METADATA_KEY)? {
            Some(bytes) => {
                bincode::deserialize(&bytes).map_err(|e| StoreError::DeserializationFailed {
                    key: String::from_utf8_lossy(METADATA_KEY).into_owned(),
                    reason: e.to_string(),
                })
            }
            None => Ok(StoreMetadata::default()),
        }
    }

    async fn put_metadata(&self, metadata: &StoreMetadata) -> StoreResult<()> {
        let bytes = bincode::serialize(metadata).map_err(|e| StoreError::SerializationFailed {
            key: String::from_utf8_lossy(METADATA_KEY).into_owned(),
            reason: e.to_string(),
        })?;
        self.db.insert(METADATA_KEY, bytes)?;
        Ok(())
    }

    fn batch_lock(&self) -> &Mutex<()> {
        &self.batch_lock
    }

    async fn len(&self) -> StoreResult<usize> {
        Ok(self.db.scan_prefix(ROW_PREFIX).count())
    }

    async fn flush(&self) -> StoreResult<()> {
        let flushed = self.db.flush()?;
        self.stats.write().flush_count += 1;

        debug!("Flushed {} bytes to disk", flushed);
        Ok(())
    }
}
