//! Window bounds
//!
//! A batch window is a half-open time range `[start, end)`. Every event with
//! `start <= occurred_at < end` belongs to the window's batch.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use review_rollup_types::events::parse_timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{WindowError, WindowResult};

/// Represents the time bounds of a batch window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowBounds {
    /// Start time of the window (inclusive)
    pub start: DateTime<Utc>,
    /// End time of the window (exclusive)
    pub end: DateTime<Utc>,
}

impl WindowBounds {
    /// Create new window bounds
    ///
    /// # Panics
    ///
    /// Panics if `start` is not before `end`. Use [`WindowBounds::try_new`]
    /// for untrusted input.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        assert!(start < end, "Window start must be before end");
        Self { start, end }
    }

    /// Create new window bounds, rejecting empty or inverted ranges
    pub fn try_new(start: DateTime<Utc>, end: DateTime<Utc>) -> WindowResult<Self> {
        if start >= end {
            return Err(WindowError::InvalidBounds { start, end });
        }
        Ok(Self { start, end })
    }

    /// Get the duration of the window
    pub fn duration(&self) -> Duration {
        self.end.signed_duration_since(self.start)
    }

    /// Check if a timestamp falls within this window
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.start && timestamp < self.end
    }

    /// Whether `next` starts exactly where this window ends
    pub fn is_contiguous_with(&self, next: &WindowBounds) -> bool {
        self.end == next.start
    }
}

impl fmt::Display for WindowBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} - {})",
            self.start.format("%Y-%m-%d %H:%M:%S"),
            self.end.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

impl PartialOrd for WindowBounds {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WindowBounds {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.start
            .cmp(&other.start)
            .then_with(|| self.end.cmp(&other.end))
    }
}

/// Parses `START,END`, where each side is a date (`2018-02-01`, midnight UTC)
/// or a timestamp the review feed understands.
impl FromStr for WindowBounds {
    type Err = WindowError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (start, end) = input.split_once(',').ok_or_else(|| WindowError::Parse {
            input: input.to_string(),
            reason: "expected START,END".to_string(),
        })?;
        let start = parse_instant(start.trim()).ok_or_else(|| WindowError::Parse {
            input: input.to_string(),
            reason: format!("bad start '{}'", start.trim()),
        })?;
        let end = parse_instant(end.trim()).ok_or_else(|| WindowError::Parse {
            input: input.to_string(),
            reason: format!("bad end '{}'", end.trim()),
        })?;
        Self::try_new(start, end)
    }
}

/// Parse a date or timestamp into an instant
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    parse_timestamp(raw)
}
