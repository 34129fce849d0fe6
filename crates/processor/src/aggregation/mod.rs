//! Batch aggregation over raw review events
//!
//! A batch aggregator turns the raw events of one window into at most one
//! [`BatchAggregateRow`] per entity: mean rating, counter aggregate, latest
//! activity and sample count.
//!
//! # Examples
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use processor::aggregation::{CounterAggregate, EventLogAggregator};
//! use processor::window::WindowBounds;
//! use review_rollup_types::ReviewEvent;
//!
//! let at = Utc.with_ymd_and_hms(2018, 2, 1, 12, 0, 0).unwrap();
//! let log = EventLogAggregator::new(
//!     vec![
//!         ReviewEvent::new("biz", 5.0, 2, 0, 0, at),
//!         ReviewEvent::new("biz", 3.0, 1, 0, 0, at),
//!     ],
//!     CounterAggregate::Sum,
//! );
//!
//! let window = WindowBounds::new(
//!     Utc.with_ymd_and_hms(2018, 2, 1, 0, 0, 0).unwrap(),
//!     Utc.with_ymd_and_hms(2018, 2, 2, 0, 0, 0).unwrap(),
//! );
//! let rows = log.aggregate_window(&window);
//!
//! assert_eq!(rows[0].rating, 4.0);
//! assert_eq!(rows[0].useful, 3);
//! ```
//!
//! [`BatchAggregateRow`]: review_rollup_types::BatchAggregateRow

mod accumulator;
mod batch;
mod event_log;

pub use accumulator::EntityAccumulator;
pub use batch::BatchAggregator;
pub use event_log::{parse_json_lines, EventLogAggregator};

use crate::merge::CounterMode;
use serde::{Deserialize, Serialize};

/// How a batch summarizes counters across its events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterAggregate {
    /// Total across the batch's events
    #[default]
    Sum,
    /// Rounded per-event mean
    Average,
}

/// Additive merges expect batch totals; averaging merges expect batch means
impl From<CounterMode> for CounterAggregate {
    fn from(mode: CounterMode) -> Self {
        match mode {
            CounterMode::Additive => CounterAggregate::Sum,
            CounterMode::Averaging => CounterAggregate::Average,
        }
    }
}
