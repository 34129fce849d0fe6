//! Label sets for rollup metrics

use prometheus_client::encoding::{EncodeLabelSet, EncodeLabelValue};
use std::fmt;

/// What happened to one batch row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EncodeLabelValue)]
pub enum RowOutcomeLabel {
    Inserted,
    Combined,
    Rejected,
    Skipped,
    Failed,
}

impl fmt::Display for RowOutcomeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowOutcomeLabel::Inserted => write!(f, "inserted"),
            RowOutcomeLabel::Combined => write!(f, "combined"),
            RowOutcomeLabel::Rejected => write!(f, "rejected"),
            RowOutcomeLabel::Skipped => write!(f, "skipped"),
            RowOutcomeLabel::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, EncodeLabelSet)]
pub struct RowOutcomeLabels {
    pub outcome: RowOutcomeLabel,
}

impl From<RowOutcomeLabel> for RowOutcomeLabels {
    fn from(outcome: RowOutcomeLabel) -> Self {
        Self { outcome }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_display() {
        assert_eq!(RowOutcomeLabel::Inserted.to_string(), "inserted");
        assert_eq!(RowOutcomeLabel::Failed.to_string(), "failed");
    }
}
