//! End-to-end tests: raw review feed through windows into the summary table

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use processor::aggregation::{parse_json_lines, CounterAggregate, EventLogAggregator};
use processor::config::EngineConfig;
use processor::merge::{CombinePolicy, CounterMode, MergeEngine, RatingMode};
use processor::pipeline::RollupPipeline;
use processor::reporter::MetricsReporter;
use processor::state::{MemorySummaryStore, SummaryStore};
use processor::window::{WindowBounds, WindowSchedule};
use std::sync::Arc;

fn ts(month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2018, month, day, hour, 0, 0).unwrap()
}

/// Review feed in the source dump's native field names
const FEED: &str = r#"
{"business_id":"X","stars":4,"useful":1,"funny":0,"cool":0,"date":"2018-01-05 10:00:00"}
{"business_id":"X","stars":2,"useful":2,"funny":1,"cool":0,"date":"2018-01-10 10:00:00"}
{"business_id":"Y","stars":5,"useful":0,"funny":0,"cool":3,"date":"2018-01-20 08:30:00"}
{"business_id":"X","stars":1,"useful":4,"funny":0,"cool":1,"date":"2018-02-01 10:00:00"}
{"business_id":"Z","stars":4,"useful":1,"funny":1,"cool":1,"date":"2018-02-01 12:00:00"}
{"business_id":"Y","stars":3,"useful":2,"funny":0,"cool":0,"date":"2018-02-03 09:00:00"}
{"business_id":"Z","stars":2,"useful":0,"funny":0,"cool":0,"date":"2018-02-10 18:00:00"}
{"business_id":"Z","stars":5,"useful":5,"funny":2,"cool":0,"date":"2018-02-12 07:00:00"}
{"business_id":"Q","stars":5,"useful":0,"funny":0,"cool":0,"date":"2018-02-14 00:00:00"}
"#;

fn scenario_schedule() -> WindowSchedule {
    WindowSchedule::from_windows(vec![
        "2018-01-01,2018-02-01".parse::<WindowBounds>().unwrap(),
        "2018-02-01,2018-02-02".parse::<WindowBounds>().unwrap(),
        "2018-02-02,2018-02-14".parse::<WindowBounds>().unwrap(),
    ])
    .unwrap()
}

async fn scenario_pipeline(
    policy: CombinePolicy,
) -> (RollupPipeline<EventLogAggregator>, MemorySummaryStore) {
    let events = parse_json_lines(FEED).unwrap();
    let aggregator = EventLogAggregator::new(events, CounterAggregate::from(policy.counter_mode));

    let store = MemorySummaryStore::new();
    let engine = MergeEngine::attach(Arc::new(store.clone()), EngineConfig::with_policy(policy))
        .await
        .unwrap();

    (RollupPipeline::new(aggregator, engine), store)
}

#[tokio::test]
async fn test_three_window_scenario() {
    let (pipeline, store) = scenario_pipeline(CombinePolicy::default()).await;
    let outcomes = pipeline.run(&scenario_schedule()).await.unwrap();

    // Initial load creates X and Y
    assert_eq!(outcomes[0].merge.inserted, vec!["X", "Y"]);
    // Second window updates X and inserts Z
    assert_eq!(outcomes[1].merge.combined, vec!["X"]);
    assert_eq!(outcomes[1].merge.inserted, vec!["Z"]);
    // Third window updates Y and Z
    assert_eq!(outcomes[2].merge.combined, vec!["Y", "Z"]);
    assert!(outcomes[2].merge.inserted.is_empty());

    // Q sits exactly on the last window's end and is never merged
    assert_eq!(store.len().await.unwrap(), 3);

    let x = store.get("X").await.unwrap().unwrap();
    assert_eq!(x.rating, 2.0);
    assert_eq!(x.useful, 7);
    assert_eq!(x.latest_activity_at, ts(2, 1, 10));
    assert_eq!(x.sample_count, 3);
    // Pairwise chain, not the plain mean of all of X's reviews
    assert_ne!(x.rating, (4.0 + 2.0 + 1.0) / 3.0);

    let y = store.get("Y").await.unwrap().unwrap();
    assert_eq!(y.rating, 4.0);
    assert_eq!(y.cool, 3);
    assert_eq!(y.latest_activity_at, ts(2, 3, 9));
    assert_eq!(y.sample_count, 2);

    let z = store.get("Z").await.unwrap().unwrap();
    assert_eq!(z.rating, 3.75);
    assert_eq!(z.useful, 6);
    assert_eq!(z.latest_activity_at, ts(2, 12, 7));

    let stats = pipeline.stats();
    assert_eq!(stats.windows_processed, 3);
    assert_eq!(stats.rows_inserted, 3);
    assert_eq!(stats.rows_combined, 3);
}

#[tokio::test]
async fn test_three_window_scenario_weighted() {
    let policy = CombinePolicy::new(CounterMode::Additive, RatingMode::Weighted);
    let (pipeline, store) = scenario_pipeline(policy).await;
    pipeline.run(&scenario_schedule()).await.unwrap();

    // Weighted by review count this is the plain mean over X's reviews
    let x = store.get("X").await.unwrap().unwrap();
    assert!((x.rating - 7.0 / 3.0).abs() < 1e-9);

    let z = store.get("Z").await.unwrap().unwrap();
    assert!((z.rating - 11.0 / 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_three_window_scenario_averaging_counters() {
    let policy = CombinePolicy::new(CounterMode::Averaging, RatingMode::Unweighted);
    let (pipeline, store) = scenario_pipeline(policy).await;
    pipeline.run(&scenario_schedule()).await.unwrap();

    // Batch 1 averages X's useful votes to round(3 / 2) = 2, then (2 + 4) / 2
    let x = store.get("X").await.unwrap().unwrap();
    assert_eq!(x.useful, 3);
}

#[tokio::test]
async fn test_reports_after_each_window() {
    let (pipeline, _store) = scenario_pipeline(CombinePolicy::default()).await;
    let pipeline = pipeline.with_reporting(true);
    let outcomes = pipeline.run(&scenario_schedule()).await.unwrap();

    let first = outcomes[0].summary.as_ref().unwrap();
    assert_eq!(first.totals.row_count, 2);
    assert_eq!(
        first.totals.max_latest_activity_at,
        Some(Utc.with_ymd_and_hms(2018, 1, 20, 8, 30, 0).unwrap())
    );

    let last = outcomes[2].summary.as_ref().unwrap();
    assert_eq!(last.totals.row_count, 3);
    assert_eq!(last.totals.sum_rating, 2.0 + 4.0 + 3.75);
    let dates: Vec<NaiveDate> = last.daily.iter().map(|d| d.date).collect();
    assert_eq!(
        dates,
        vec![
            NaiveDate::from_ymd_opt(2018, 2, 1).unwrap(),
            NaiveDate::from_ymd_opt(2018, 2, 3).unwrap(),
            NaiveDate::from_ymd_opt(2018, 2, 12).unwrap(),
        ]
    );
}

#[tokio::test]
async fn test_out_of_order_schedule_stops_run() {
    let (pipeline, store) = scenario_pipeline(CombinePolicy::default()).await;
    let later: WindowBounds = "2018-02-02,2018-02-14".parse().unwrap();
    let earlier: WindowBounds = "2018-01-01,2018-02-01".parse().unwrap();

    pipeline
        .run(&WindowSchedule::from_windows(vec![later]).unwrap())
        .await
        .unwrap();
    let err = pipeline
        .run(&WindowSchedule::from_windows(vec![earlier]).unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, processor::EngineError::OutOfOrderWindow { .. }));
    // X only has January reviews, so the rejected window left no trace
    assert!(store.get("X").await.unwrap().is_none());
}

#[tokio::test]
async fn test_reporter_matches_store() {
    let (pipeline, store) = scenario_pipeline(CombinePolicy::default()).await;
    pipeline.run(&scenario_schedule()).await.unwrap();

    let rows = store.scan().await.unwrap();
    let totals = MetricsReporter::totals(&rows);
    assert_eq!(totals.sum_useful, 7 + 2 + 6);
    assert_eq!(totals.max_latest_activity_at, Some(ts(2, 12, 7)));
}
