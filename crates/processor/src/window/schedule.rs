//! Window schedules
//!
//! A schedule is the ordered sequence of batch windows a driver walks
//! through. Each window produces one batch that is merged to completion
//! before the next window is aggregated.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::types::WindowBounds;
use crate::error::{WindowError, WindowResult};

/// Ordered sequence of batch windows
///
/// Window starts are non-decreasing. Contiguity is not required; gaps and
/// overlaps between neighbours are reported by [`WindowSchedule::discontinuities`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSchedule {
    windows: Vec<WindowBounds>,
}

impl WindowSchedule {
    /// Build a schedule from explicit windows, in the order given
    pub fn from_windows(windows: Vec<WindowBounds>) -> WindowResult<Self> {
        let mut schedule = Self::default();
        for window in windows {
            schedule.push(window)?;
        }
        Ok(schedule)
    }

    /// Split `[from, to)` into consecutive windows of `size`
    ///
    /// The last window is cut short at `to` when the range is not a whole
    /// number of windows, or when `size` reaches past the representable
    /// time range.
    pub fn tumbling(from: DateTime<Utc>, to: DateTime<Utc>, size: Duration) -> WindowResult<Self> {
        if size <= Duration::zero() {
            return Err(WindowError::InvalidWindowSize {
                size_ms: size.num_milliseconds(),
            });
        }
        // Validates from < to
        WindowBounds::try_new(from, to)?;

        let mut windows = Vec::new();
        let mut start = from;
        while start < to {
            let end = start.checked_add_signed(size).map_or(to, |end| end.min(to));
            windows.push(WindowBounds::new(start, end));
            start = end;
        }
        Ok(Self { windows })
    }

    /// Append a window, keeping starts non-decreasing
    pub fn push(&mut self, window: WindowBounds) -> WindowResult<()> {
        if let Some(previous) = self.windows.last() {
            if window.start < previous.start {
                return Err(WindowError::NotAscending {
                    previous: *previous,
                    next: window,
                });
            }
        }
        self.windows.push(window);
        Ok(())
    }

    /// Neighbouring windows that do not meet end-to-start
    pub fn discontinuities(&self) -> Vec<(WindowBounds, WindowBounds)> {
        self.windows
            .windows(2)
            .filter(|pair| !pair[0].is_contiguous_with(&pair[1]))
            .map(|pair| (pair[0], pair[1]))
            .collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WindowBounds> {
        self.windows.iter()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn windows(&self) -> &[WindowBounds] {
        &self.windows
    }
}

impl IntoIterator for WindowSchedule {
    type Item = WindowBounds;
    type IntoIter = std::vec::IntoIter<WindowBounds>;

    fn into_iter(self) -> Self::IntoIter {
        self.windows.into_iter()
    }
}

impl<'a> IntoIterator for &'a WindowSchedule {
    type Item = &'a WindowBounds;
    type IntoIter = std::slice::Iter<'a, WindowBounds>;

    fn into_iter(self) -> Self::IntoIter {
        self.windows.iter()
    }
}
