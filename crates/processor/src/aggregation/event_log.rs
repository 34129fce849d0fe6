//! In-memory review event log
//!
//! Holds the raw review feed and answers window aggregation queries over it.
//! The feed is newline-delimited JSON, one review per line.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use review_rollup_types::{BatchAggregateRow, ReviewEvent};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

use super::accumulator::EntityAccumulator;
use super::batch::BatchAggregator;
use super::CounterAggregate;
use crate::error::{AggregatorError, AggregatorResult};
use crate::window::WindowBounds;

/// Batch aggregator over an in-memory event log
#[derive(Debug, Clone, Default)]
pub struct EventLogAggregator {
    events: Vec<ReviewEvent>,
    counters: CounterAggregate,
}

impl EventLogAggregator {
    pub fn new(events: Vec<ReviewEvent>, counters: CounterAggregate) -> Self {
        Self { events, counters }
    }

    /// Load a JSON-lines review feed
    ///
    /// Blank lines are ignored. The first malformed line fails the whole load.
    pub async fn from_json_lines(
        path: impl AsRef<Path>,
        counters: CounterAggregate,
    ) -> AggregatorResult<Self> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path).await?;
        let events = parse_json_lines(&contents)?;

        let log = Self::new(events, counters);
        match log.span() {
            Some((first, last)) => info!(
                path = %path.display(),
                events = log.len(),
                %first,
                %last,
                "Loaded review events"
            ),
            None => warn!(path = %path.display(), "Review feed is empty"),
        }
        Ok(log)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn counters(&self) -> CounterAggregate {
        self.counters
    }

    /// Earliest and latest event timestamps
    pub fn span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let first = self.events.iter().map(|e| e.occurred_at).min()?;
        let last = self.events.iter().map(|e| e.occurred_at).max()?;
        Some((first, last))
    }

    /// Group the window's events by entity, ordered by entity id
    pub fn aggregate_window(&self, window: &WindowBounds) -> Vec<BatchAggregateRow> {
        let mut groups: BTreeMap<&str, EntityAccumulator> = BTreeMap::new();

        for event in self.events.iter().filter(|e| window.contains(e.occurred_at)) {
            groups.entry(event.entity_id.as_str()).or_default().update(event);
        }

        let rows: Vec<_> = groups
            .iter()
            .filter_map(|(entity_id, acc)| acc.finalize(entity_id, self.counters))
            .collect();

        debug!(%window, entities = rows.len(), "Aggregated window");
        rows
    }
}

#[async_trait]
impl BatchAggregator for EventLogAggregator {
    async fn aggregate(&self, window: &WindowBounds) -> AggregatorResult<Vec<BatchAggregateRow>> {
        Ok(self.aggregate_window(window))
    }
}

/// Parse newline-delimited JSON reviews; line numbers in errors are 1-based
pub fn parse_json_lines(contents: &str) -> AggregatorResult<Vec<ReviewEvent>> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|e| AggregatorError::MalformedEvent {
                line: index + 1,
                reason: e.to_string(),
            })
        })
        .collect()
}
