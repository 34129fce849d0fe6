//! Summary store trait definition
//!
//! This module defines the `SummaryStore` trait that every summary table
//! implementation provides: a keyed table of [`EntitySummary`] rows with point
//! lookup, point upsert and snapshot scan, plus a small metadata record the
//! merge engine uses to pin its combine policy and window progress.

use async_trait::async_trait;
use review_rollup_types::EntitySummary;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::StoreResult;
use crate::merge::CombinePolicy;
use crate::window::WindowBounds;

/// Store-level bookkeeping written by the merge engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreMetadata {
    /// Policy every merge into this store has used
    pub policy: Option<CombinePolicy>,
    /// Most recent window merged into this store
    pub last_window: Option<WindowBounds>,
    /// Number of batches merged so far
    pub batches_merged: u64,
}

/// Core trait for summary table implementations
///
/// ## Implementation Requirements
///
/// - **Validation**: `upsert` runs [`EntitySummary::validate`] first and
///   leaves the stored row untouched when it fails
/// - **Per-key atomicity**: a reader never observes a partially written row
/// - **Snapshot scans**: `scan` must not block upserts to unrelated keys
///   indefinitely
/// - **One batch lock per table**: every handle onto the same table returns
///   the same [`batch_lock`](SummaryStore::batch_lock)
///
/// ## Example Implementation
///
/// ```rust,no_run
/// use async_trait::async_trait;
/// use processor::error::StoreResult;
/// use processor::state::{StoreMetadata, SummaryStore};
/// use review_rollup_types::EntitySummary;
/// use std::collections::HashMap;
/// use tokio::sync::{Mutex, RwLock};
///
/// struct SimpleStore {
///     rows: RwLock<HashMap<String, EntitySummary>>,
///     meta: RwLock<StoreMetadata>,
///     batches: Mutex<()>,
/// }
///
/// #[async_trait]
/// impl SummaryStore for SimpleStore {
///     async fn get(&self, entity_id: &str) -> StoreResult<Option<EntitySummary>> {
///         Ok(self.rows.read().await.get(entity_id).cloned())
///     }
///
///     async fn upsert(&self, summary: EntitySummary) -> StoreResult<()> {
///         summary.validate()?;
///         self.rows.write().await.insert(summary.entity_id.clone(), summary);
///         Ok(())
///     }
///
///     async fn scan(&self) -> StoreResult<Vec<EntitySummary>> {
///         Ok(self.rows.read().await.values().cloned().collect())
///     }
///
///     async fn remove(&self, entity_id: &str) -> StoreResult<Option<EntitySummary>> {
///         Ok(self.rows.write().await.remove(entity_id))
///     }
///
///     async fn metadata(&self) -> StoreResult<StoreMetadata> {
///         Ok(self.meta.read().await.clone())
///     }
///
///     async fn put_metadata(&self, metadata: &StoreMetadata) -> StoreResult<()> {
///         *self.meta.write().await = metadata.clone();
///         Ok(())
///     }
///
///     fn batch_lock(&self) -> &Mutex<()> {
///         &self.batches
///     }
/// }
/// ```
#[async_trait]
pub trait SummaryStore: Send + Sync {
    /// Point lookup by entity id
    ///
    /// Returns `Ok(None)` if the entity has never been merged.
    async fn get(&self, entity_id: &str) -> StoreResult<Option<EntitySummary>>;

    /// Insert the row if its entity is absent, otherwise replace the full row
    ///
    /// The row is keyed by its own `entity_id`.
    ///
    /// # Errors
    ///
    /// * `StoreError::Validation` - malformed row, nothing was written
    /// * other `StoreError` variants - storage failure
    async fn upsert(&self, summary: EntitySummary) -> StoreResult<()>;

    /// Snapshot of every row, in unspecified order
    async fn scan(&self) -> StoreResult<Vec<EntitySummary>>;

    /// Administrative removal of a row
    ///
    /// The merge engine never calls this; rows are only ever created or
    /// replaced by merges.
    async fn remove(&self, entity_id: &str) -> StoreResult<Option<EntitySummary>>;

    /// Read the store metadata (default when never written)
    async fn metadata(&self) -> StoreResult<StoreMetadata>;

    /// Replace the store metadata
    async fn put_metadata(&self, metadata: &StoreMetadata) -> StoreResult<()>;

    /// Held by a merge engine for the whole of a batch
    ///
    /// Engines attached to the same table share it, so their batches never
    /// interleave.
    fn batch_lock(&self) -> &Mutex<()>;

    /// Number of rows
    async fn len(&self) -> StoreResult<usize> {
        Ok(self.scan().await?.len())
    }

    async fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len().await? == 0)
    }

    /// Check if an entity has a row
    async fn contains(&self, entity_id: &str) -> StoreResult<bool> {
        Ok(self.get(entity_id).await?.is_some())
    }

    /// Persist buffered writes; a no-op for volatile stores
    async fn flush(&self) -> StoreResult<()> {
        Ok(())
    }
}
