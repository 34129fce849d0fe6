//! Per-batch merge outcome

use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::window::WindowBounds;

/// A row the engine refused to apply
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowRejection {
    pub entity_id: String,
    pub reason: String,
}

/// A row whose merge hit a store failure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowFailure {
    pub entity_id: String,
    pub error: String,
}

/// What one `merge_batch` call did to the store
///
/// Id lists are sorted so reports are stable across runs regardless of the
/// order rows completed in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeReport {
    pub window: WindowBounds,
    /// Number of rows handed to the engine
    pub rows_total: usize,
    /// Entities that got their first summary row from this batch
    pub inserted: Vec<String>,
    /// Entities whose existing row was combined with this batch
    pub combined: Vec<String>,
    pub rejected: Vec<RowRejection>,
    /// Store failures; non-empty only on an aborted batch
    pub failed: Vec<RowFailure>,
    /// Rows never started because of cancellation or an abort
    pub skipped: Vec<String>,
    pub cancelled: bool,
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
}

impl MergeReport {
    pub fn new(window: WindowBounds, rows_total: usize) -> Self {
        Self {
            window,
            rows_total,
            inserted: Vec::new(),
            combined: Vec::new(),
            rejected: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
            cancelled: false,
            elapsed: Duration::ZERO,
        }
    }

    /// Rows that changed the store
    pub fn applied(&self) -> usize {
        self.inserted.len() + self.combined.len()
    }

    /// Every row was either applied or rejected
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.skipped.is_empty() && self.failed.is_empty()
    }

    pub(crate) fn sort(&mut self) {
        self.inserted.sort();
        self.combined.sort();
        self.skipped.sort();
        self.rejected.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        self.failed.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
    }
}

impl fmt::Display for MergeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} rows, {} inserted, {} combined, {} rejected, {} skipped",
            self.window,
            self.rows_total,
            self.inserted.len(),
            self.combined.len(),
            self.rejected.len(),
            self.skipped.len()
        )?;
        if self.cancelled {
            write!(f, " (cancelled)")?;
        }
        Ok(())
    }
}

mod duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }
}
