//! Raw review events consumed by the batch aggregator

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Timestamp layout used by the review feed (no zone, UTC implied)
const FEED_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One review as it arrives from the feed
///
/// Field aliases accept the feed's native column names, so a raw review dump
/// (`business_id`, `stars`, `date`) deserializes without a mapping step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewEvent {
    /// Entity the review is about
    #[serde(alias = "business_id")]
    pub entity_id: String,
    /// Star rating given by the reviewer
    #[serde(alias = "stars")]
    pub rating: f64,
    /// "Useful" votes
    #[serde(default)]
    pub useful: i64,
    /// "Funny" votes
    #[serde(default)]
    pub funny: i64,
    /// "Cool" votes
    #[serde(default)]
    pub cool: i64,
    /// When the review was written
    #[serde(alias = "date", deserialize_with = "deserialize_timestamp")]
    pub occurred_at: DateTime<Utc>,
}

impl ReviewEvent {
    /// Create a new review event
    pub fn new(
        entity_id: impl Into<String>,
        rating: f64,
        useful: i64,
        funny: i64,
        cool: i64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            rating,
            useful,
            funny,
            cool,
            occurred_at,
        }
    }
}

/// Parse a feed timestamp, either RFC 3339 or `YYYY-MM-DD HH:MM:SS` in UTC
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, FEED_TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognized timestamp '{raw}'")))
}
