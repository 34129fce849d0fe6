//! Summary stores
//!
//! This module provides the keyed summary table the merge engine reads from
//! and writes to. It is the only long-lived mutable state in the system:
//!
//! - **SummaryStore Trait**: point lookup, point upsert, snapshot scan
//! - **Memory**: DashMap-backed table for tests and one-shot runs
//! - **Sled**: persistent embedded table that survives restarts
//!
//! Every implementation validates rows on upsert and replaces rows whole, so
//! merges are atomic per entity.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use processor::state::{MemorySummaryStore, SummaryStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = MemorySummaryStore::new();
//!
//!     for row in store.scan().await? {
//!         println!("{} -> {:.2}", row.entity_id, row.rating);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod memory;
pub mod sled_backend;

// Re-export main types
pub use backend::{StoreMetadata, SummaryStore};
pub use memory::{MemoryStoreStats, MemorySummaryStore};
pub use sled_backend::{SledConfig, SledStoreStats, SledSummaryStore};
