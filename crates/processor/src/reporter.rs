//! Read-only projections of the summary table
//!
//! Two views are produced after each merge: whole-table totals and a
//! per-day breakdown keyed by the UTC date of each entity's latest activity.

use chrono::{DateTime, NaiveDate, Utc};
use review_rollup_types::EntitySummary;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::StoreResult;
use crate::state::SummaryStore;

/// Aggregate columns shared by the totals and per-day projections
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TotalsRow {
    pub row_count: u64,
    pub sum_rating: f64,
    pub sum_useful: i64,
    pub sum_funny: i64,
    pub sum_cool: i64,
    pub max_latest_activity_at: Option<DateTime<Utc>>,
}

impl TotalsRow {
    fn add(&mut self, row: &EntitySummary) {
        self.row_count += 1;
        self.sum_rating += row.rating;
        self.sum_useful = self.sum_useful.saturating_add(row.useful);
        self.sum_funny = self.sum_funny.saturating_add(row.funny);
        self.sum_cool = self.sum_cool.saturating_add(row.cool);
        self.max_latest_activity_at = Some(
            self.max_latest_activity_at
                .map_or(row.latest_activity_at, |max| max.max(row.latest_activity_at)),
        );
    }

    /// Mean rating across rows, `None` for an empty table
    pub fn mean_rating(&self) -> Option<f64> {
        (self.row_count > 0).then(|| self.sum_rating / self.row_count as f64)
    }
}

/// Totals for the entities whose latest activity falls on `date`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyRow {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub totals: TotalsRow,
}

/// Both projections of one snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryReport {
    pub totals: TotalsRow,
    pub daily: Vec<DailyRow>,
}

/// Computes reporting projections from summary rows
pub struct MetricsReporter;

impl MetricsReporter {
    /// Whole-table totals
    pub fn totals(rows: &[EntitySummary]) -> TotalsRow {
        rows.iter().fold(TotalsRow::default(), |mut totals, row| {
            totals.add(row);
            totals
        })
    }

    /// Totals grouped by the date of `latest_activity_at`, oldest first
    pub fn daily(rows: &[EntitySummary]) -> Vec<DailyRow> {
        let mut days: BTreeMap<NaiveDate, TotalsRow> = BTreeMap::new();
        for row in rows {
            days.entry(row.latest_activity_at.date_naive())
                .or_default()
                .add(row);
        }

        days.into_iter()
            .map(|(date, totals)| DailyRow { date, totals })
            .collect()
    }

    /// Scan the store once and compute both projections
    ///
    /// Should not run while a batch is being merged into the same store.
    pub async fn snapshot(store: &dyn SummaryStore) -> StoreResult<SummaryReport> {
        let rows = store.scan().await?;
        Ok(SummaryReport {
            totals: Self::totals(&rows),
            daily: Self::daily(&rows),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MemorySummaryStore;
    use chrono::TimeZone;

    fn row(id: &str, rating: f64, useful: i64, day: u32, hour: u32) -> EntitySummary {
        EntitySummary {
            entity_id: id.to_string(),
            rating,
            useful,
            funny: 1,
            cool: 0,
            latest_activity_at: Utc.with_ymd_and_hms(2018, 2, day, hour, 0, 0).unwrap(),
            sample_count: 1,
        }
    }

    #[test]
    fn test_totals_empty() {
        let totals = MetricsReporter::totals(&[]);
        assert_eq!(totals, TotalsRow::default());
        assert_eq!(totals.mean_rating(), None);
    }

    #[test]
    fn test_totals() {
        let rows = vec![row("a", 4.0, 10, 1, 8), row("b", 2.0, 6, 3, 9)];
        let totals = MetricsReporter::totals(&rows);

        assert_eq!(totals.row_count, 2);
        assert_eq!(totals.sum_rating, 6.0);
        assert_eq!(totals.sum_useful, 16);
        assert_eq!(totals.sum_funny, 2);
        assert_eq!(
            totals.max_latest_activity_at,
            Some(Utc.with_ymd_and_hms(2018, 2, 3, 9, 0, 0).unwrap())
        );
        assert_eq!(totals.mean_rating(), Some(3.0));
    }

    #[test]
    fn test_daily_sorted_by_date() {
        let rows = vec![
            row("c", 5.0, 1, 3, 1),
            row("a", 4.0, 10, 1, 8),
            row("b", 2.0, 6, 1, 23),
        ];
        let daily = MetricsReporter::daily(&rows);

        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].date, NaiveDate::from_ymd_opt(2018, 2, 1).unwrap());
        assert_eq!(daily[0].totals.row_count, 2);
        assert_eq!(daily[0].totals.sum_useful, 16);
        assert_eq!(daily[1].date, NaiveDate::from_ymd_opt(2018, 2, 3).unwrap());
        assert_eq!(daily[1].totals.sum_rating, 5.0);
    }

    #[tokio::test]
    async fn test_snapshot_from_store() {
        let store =
            MemorySummaryStore::with_rows(vec![row("a", 4.0, 10, 1, 8), row("b", 2.0, 6, 2, 9)])
                .unwrap();

        let report = MetricsReporter::snapshot(&store).await.unwrap();
        assert_eq!(report.totals.row_count, 2);
        assert_eq!(report.daily.len(), 2);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["daily"][0]["date"], "2018-02-01");
        assert_eq!(json["daily"][0]["row_count"], 1);
    }
}
