//! In-memory summary store
//!
//! This module provides a summary table backed by DashMap. Each row is
//! replaced whole under its shard lock, so a concurrent reader sees either
//! the previous row or the new one, never a mix.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use review_rollup_types::EntitySummary;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::trace;

use super::backend::{StoreMetadata, SummaryStore};
use crate::error::StoreResult;

/// Statistics about the memory summary store
#[derive(Debug, Clone, Default)]
pub struct MemoryStoreStats {
    /// Number of get operations
    pub get_count: u64,
    /// Number of lookups that found a row
    pub hit_count: u64,
    /// Number of lookups that found nothing
    pub miss_count: u64,
    /// Number of upserts that created a row
    pub insert_count: u64,
    /// Number of upserts that replaced a row
    pub replace_count: u64,
    /// Number of upserts rejected by validation
    pub rejected_count: u64,
}

/// In-memory summary store using DashMap
///
/// Ideal for tests and one-shot runs where the summary does not need to
/// survive the process.
///
/// ## Example
///
/// ```rust,no_run
/// use processor::state::{MemorySummaryStore, SummaryStore};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let store = MemorySummaryStore::new();
///
///     if let Some(row) = store.get("biz-1").await? {
///         println!("rating: {:.2}", row.rating);
///     }
///
///     let stats = store.stats();
///     println!("lookups: {}", stats.get_count);
///     Ok(())
/// }
/// ```
pub struct MemorySummaryStore {
    rows: Arc<DashMap<String, EntitySummary>>,
    metadata: Arc<RwLock<StoreMetadata>>,
    stats: Arc<RwLock<MemoryStoreStats>>,
    batch_lock: Arc<Mutex<()>>,
}

impl MemorySummaryStore {
    /// Create a new, empty in-memory store
    pub fn new() -> Self {
        Self {
            rows: Arc::new(DashMap::new()),
            metadata: Arc::new(RwLock::new(StoreMetadata::default())),
            stats: Arc::new(RwLock::new(MemoryStoreStats::default())),
            batch_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Create a store pre-populated with rows
    ///
    /// Rows are validated like any upsert.
    pub fn with_rows(rows: impl IntoIterator<Item = EntitySummary>) -> StoreResult<Self> {
        let store = Self::new();
        for row in rows {
            row.validate()?;
            store.rows.insert(row.entity_id.clone(), row);
        }
        Ok(store)
    }

    /// Get a snapshot of current statistics
    pub fn stats(&self) -> MemoryStoreStats {
        self.stats.read().clone()
    }
}

impl Default for MemorySummaryStore {
    fn default() -> Self {
        Self::new()
    }
}

// Clones share the same table
impl Clone for MemorySummaryStore {
    fn clone(&self) -> Self {
        Self {
            rows: Arc::clone(&self.rows),
            metadata: Arc::clone(&self.metadata),
            stats: Arc::clone(&self.stats),
            batch_lock: Arc::clone(&self.batch_lock),
        }
    }
}

#[async_trait]
impl SummaryStore for MemorySummaryStore {
    async fn get(&self, entity_id: &str) -> StoreResult<Option<EntitySummary>> {
        trace!(entity_id, "Getting summary row");

        let row = self.rows.get(entity_id).map(|entry| entry.value().clone());

        let mut stats = self.stats.write();
        stats.get_count += 1;
        if row.is_some() {
            stats.hit_count += 1;
        } else {
            stats.miss_count += 1;
        }

        Ok(row)
    }

    async fn upsert(&self, summary: EntitySummary) -> StoreResult<()> {
        trace!(entity_id = %summary.entity_id, "Upserting summary row");

        if let Err(err) = summary.validate() {
            self.stats.write().rejected_count += 1;
            return Err(err.into());
        }

        let replaced = self.rows.insert(summary.entity_id.clone(), summary).is_some();

        let mut stats = self.stats.write();
        if replaced {
            stats.replace_count += 1;
        } else {
            stats.insert_count += 1;
        }

        Ok(())
    }

    async fn scan(&self) -> StoreResult<Vec<EntitySummary>> {
        trace!("Scanning {} summary rows", self.rows.len());

        Ok(self
            .rows
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn remove(&self, entity_id: &str) -> StoreResult<Option<EntitySummary>> {
        trace!(entity_id, "Removing summary row");
        Ok(self.rows.remove(entity_id).map(|(_, row)| row))
    }

    async fn metadata(&self) -> StoreResult<StoreMetadata> {
        Ok(self.metadata.read().clone())
    }

    async fn put_metadata(&self, metadata: &StoreMetadata) -> StoreResult<()> {
        *self.metadata.write() = metadata.clone();
        Ok(())
    }

    fn batch_lock(&self) -> &Mutex<()> {
        &self.batch_lock
    }

    async fn len(&self) -> StoreResult<usize> {
        Ok(self.rows.len())
    }

    async fn contains(&self, entity_id: &str) -> StoreResult<bool> {
        Ok(self.rows.contains_key(entity_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::backend::tests::*;

    #[tokio::test]
    async fn test_memory_store_basic() {
        test_store_basic_ops(MemorySummaryStore::new()).await;
    }

    #[tokio::test]
    async fn test_memory_store_rejects_malformed() {
        test_store_rejects_malformed_rows(MemorySummaryStore::new()).await;
    }

    #[tokio::test]
    async fn test_memory_store_scan() {
        test_store_scan(MemorySummaryStore::new()).await;
    }

    #[tokio::test]
    async fn test_memory_store_metadata() {
        test_store_metadata(MemorySummaryStore::new()).await;
    }

    #[tokio::test]
    async fn test_memory_store_stats() {
        let store = MemorySummaryStore::new();
        store.get("a").await.unwrap();
        store.upsert(summary("a", 4.0, 1)).await.unwrap();
        store.upsert(summary("a", 4.5, 2)).await.unwrap();
        store.get("a").await.unwrap();
        let _ = store.upsert(summary("a", f64::INFINITY, 2)).await;

        let stats = store.stats();
        assert_eq!(stats.get_count, 2);
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 1);
        assert_eq!(stats.insert_count, 1);
        assert_eq!(stats.replace_count, 1);
        assert_eq!(stats.rejected_count, 1);
    }

    #[tokio::test]
    async fn test_memory_store_clone_shares_rows() {
        let store = MemorySummaryStore::new();
        let handle = store.clone();
        handle.upsert(summary("a", 4.0, 1)).await.unwrap();
        assert!(store.contains("a").await.unwrap());
    }

    #[test]
    fn test_with_rows_validates() {
        assert!(MemorySummaryStore::with_rows(vec![summary("a", f64::NAN, 0)]).is_err());
        assert!(MemorySummaryStore::with_rows(vec![summary("a", 2.0, 0)]).is_ok());
    }
}
