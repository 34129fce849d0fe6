//! Batch windows
//!
//! Batches are defined by half-open time windows `[start, end)`. A driver
//! supplies them as a [`WindowSchedule`] in non-decreasing start order:
//!
//! ```text
//! Time:     Jan 1 ............ Feb 1 ... Feb 2 ........ Feb 14
//! Windows:  [------------------)[--------)[--------------)
//!            initial load       update    delayed update
//! ```
//!
//! Windows are usually contiguous, but only the ordering is required.
//!
//! # Example
//!
//! ```rust
//! use processor::window::{WindowBounds, WindowSchedule};
//!
//! let schedule = WindowSchedule::from_windows(vec![
//!     "2018-01-01,2018-02-01".parse::<WindowBounds>().unwrap(),
//!     "2018-02-01,2018-02-02".parse::<WindowBounds>().unwrap(),
//! ])
//! .unwrap();
//!
//! assert_eq!(schedule.len(), 2);
//! ```

pub mod schedule;
pub mod types;

pub use schedule::WindowSchedule;
pub use types::{parse_instant, WindowBounds};
