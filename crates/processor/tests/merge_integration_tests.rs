//! Integration tests for the merge engine

use chrono::{DateTime, TimeZone, Utc};
use processor::config::EngineConfig;
use processor::merge::{CombinePolicy, CounterMode, MergeEngine, RatingMode};
use processor::state::{MemorySummaryStore, SummaryStore};
use processor::window::WindowBounds;
use review_rollup_types::{BatchAggregateRow, EntitySummary};
use std::sync::Arc;

fn ts(month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2018, month, day, hour, 0, 0).unwrap()
}

fn window(from_day: u32, to_day: u32) -> WindowBounds {
    WindowBounds::new(ts(2, from_day, 0), ts(2, to_day, 0))
}

fn batch_row(id: &str, rating: f64, useful: i64, at: DateTime<Utc>) -> BatchAggregateRow {
    BatchAggregateRow::new(id, rating, (useful, 1, 2), at, 1)
}

async fn engine(
    policy: CombinePolicy,
    enforce_window_order: bool,
) -> (MergeEngine, MemorySummaryStore) {
    let store = MemorySummaryStore::new();
    let config = EngineConfig {
        enforce_window_order,
        ..EngineConfig::with_policy(policy)
    };
    let engine = MergeEngine::attach(Arc::new(store.clone()), config)
        .await
        .unwrap();
    (engine, store)
}

async fn sorted_rows(store: &MemorySummaryStore) -> Vec<EntitySummary> {
    let mut rows = store.scan().await.unwrap();
    rows.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
    rows
}

#[tokio::test]
async fn test_insert_produces_identical_row() {
    let (engine, store) = engine(CombinePolicy::default(), true).await;
    let row = BatchAggregateRow::new("x", 3.5, (7, 2, 9), ts(2, 1, 15), 4);

    engine.merge_batch(window(1, 2), vec![row.clone()]).await.unwrap();

    let stored = store.get("x").await.unwrap().unwrap();
    assert_eq!(stored.entity_id, row.entity_id);
    assert_eq!(stored.rating, row.rating);
    assert_eq!(stored.useful, row.useful);
    assert_eq!(stored.funny, row.funny);
    assert_eq!(stored.cool, row.cool);
    assert_eq!(stored.latest_activity_at, row.latest_activity_at);
    assert_eq!(stored.sample_count, row.sample_count);
}

#[tokio::test]
async fn test_additive_combine() {
    let (engine, store) = engine(CombinePolicy::default(), true).await;
    let t1 = ts(2, 1, 9);
    let t2 = ts(2, 2, 9);

    engine
        .merge_batch(window(1, 2), vec![batch_row("x", 4.0, 10, t1)])
        .await
        .unwrap();
    engine
        .merge_batch(window(2, 3), vec![batch_row("x", 2.0, 6, t2)])
        .await
        .unwrap();

    let merged = store.get("x").await.unwrap().unwrap();
    assert_eq!(merged.rating, 3.0);
    assert_eq!(merged.useful, 16);
    assert_eq!(merged.funny, 2);
    assert_eq!(merged.cool, 4);
    assert_eq!(merged.latest_activity_at, t2);
}

#[tokio::test]
async fn test_averaging_combine() {
    let policy = CombinePolicy::new(CounterMode::Averaging, RatingMode::Unweighted);
    let (engine, store) = engine(policy, true).await;

    engine
        .merge_batch(window(1, 2), vec![batch_row("x", 4.0, 10, ts(2, 1, 9))])
        .await
        .unwrap();
    engine
        .merge_batch(window(2, 3), vec![batch_row("x", 2.0, 6, ts(2, 2, 9))])
        .await
        .unwrap();

    let merged = store.get("x").await.unwrap().unwrap();
    assert_eq!(merged.rating, 3.0);
    assert_eq!(merged.useful, 8);
    assert_eq!(engine.policy().counter_mode, CounterMode::Averaging);
}

#[tokio::test]
async fn test_latest_activity_is_monotonic() {
    let (engine, store) = engine(CombinePolicy::default(), true).await;
    let timestamps = [ts(2, 5, 0), ts(2, 2, 0), ts(2, 7, 0), ts(2, 1, 0), ts(2, 7, 0)];

    let mut previous: Option<DateTime<Utc>> = None;
    for (i, at) in timestamps.iter().enumerate() {
        let day = i as u32 + 1;
        engine
            .merge_batch(window(day, day + 1), vec![batch_row("x", 3.0, 1, *at)])
            .await
            .unwrap();

        let latest = store.get("x").await.unwrap().unwrap().latest_activity_at;
        if let Some(previous) = previous {
            assert!(latest >= previous);
        }
        assert_eq!(latest, *timestamps[..=i].iter().max().unwrap());
        previous = Some(latest);
    }
}

#[tokio::test]
async fn test_merging_same_batch_twice_is_not_idempotent() {
    let (once, once_store) = engine(CombinePolicy::default(), true).await;
    let (twice, twice_store) = engine(CombinePolicy::default(), true).await;

    let seed = vec![batch_row("x", 5.0, 10, ts(2, 1, 0))];
    let batch = vec![batch_row("x", 1.0, 4, ts(2, 2, 0))];

    for engine in [&once, &twice] {
        engine.merge_batch(window(1, 2), seed.clone()).await.unwrap();
        engine.merge_batch(window(2, 3), batch.clone()).await.unwrap();
    }
    // Re-running the same window is allowed and applies the batch again
    twice.merge_batch(window(2, 3), batch).await.unwrap();

    let once_row = once_store.get("x").await.unwrap().unwrap();
    let twice_row = twice_store.get("x").await.unwrap().unwrap();

    assert_eq!(once_row.rating, 3.0);
    assert_eq!(twice_row.rating, 2.0);
    assert_ne!(once_row.rating, twice_row.rating);
    // Rating drifts toward the repeated batch's value
    assert!((twice_row.rating - 1.0).abs() < (once_row.rating - 1.0).abs());
    assert_eq!(once_row.useful, 14);
    assert_eq!(twice_row.useful, 18);
}

#[tokio::test]
async fn test_partition_independence() {
    let seed = vec![
        batch_row("a", 4.0, 3, ts(2, 1, 1)),
        batch_row("b", 2.0, 5, ts(2, 1, 2)),
    ];
    let batch = vec![
        batch_row("a", 1.0, 1, ts(2, 2, 1)),
        batch_row("b", 5.0, 2, ts(2, 2, 2)),
        batch_row("c", 3.0, 7, ts(2, 2, 3)),
    ];

    let (whole, whole_store) = engine(CombinePolicy::default(), true).await;
    whole.merge_batch(window(1, 2), seed.clone()).await.unwrap();
    whole.merge_batch(window(2, 3), batch.clone()).await.unwrap();
    let expected = sorted_rows(&whole_store).await;

    for order in [[0, 1, 2], [2, 1, 0], [1, 2, 0]] {
        let (split, split_store) = engine(CombinePolicy::default(), true).await;
        split.merge_batch(window(1, 2), seed.clone()).await.unwrap();
        for index in order {
            split
                .merge_batch(window(2, 3), vec![batch[index].clone()])
                .await
                .unwrap();
        }
        assert_eq!(sorted_rows(&split_store).await, expected);
    }
}

#[tokio::test]
async fn test_wide_batch_visits_every_row_once() {
    let store = MemorySummaryStore::new();
    let config = EngineConfig {
        parallelism: 16,
        ..Default::default()
    };
    let engine = MergeEngine::attach(Arc::new(store.clone()), config)
        .await
        .unwrap();

    let rows: Vec<_> = (0..500)
        .map(|i| batch_row(&format!("biz-{i:03}"), 1.0 + (i % 5) as f64, i, ts(2, 1, 6)))
        .collect();
    let report = engine.merge_batch(window(1, 2), rows.clone()).await.unwrap();
    assert_eq!(report.inserted.len(), 500);

    let report = engine.merge_batch(window(2, 3), rows).await.unwrap();
    assert_eq!(report.combined.len(), 500);
    assert!(report.inserted.is_empty());

    let stats = store.stats();
    assert_eq!(stats.insert_count, 500);
    assert_eq!(stats.replace_count, 500);
    assert_eq!(store.get("biz-007").await.unwrap().unwrap().useful, 14);
}

#[tokio::test]
async fn test_weighted_rating_tracks_sample_counts() {
    let policy = CombinePolicy::new(CounterMode::Additive, RatingMode::Weighted);
    let (engine, store) = engine(policy, true).await;

    engine
        .merge_batch(
            window(1, 2),
            vec![BatchAggregateRow::new("x", 5.0, (0, 0, 0), ts(2, 1, 0), 9)],
        )
        .await
        .unwrap();
    engine
        .merge_batch(
            window(2, 3),
            vec![BatchAggregateRow::new("x", 1.0, (0, 0, 0), ts(2, 2, 0), 1)],
        )
        .await
        .unwrap();

    let merged = store.get("x").await.unwrap().unwrap();
    assert!((merged.rating - 4.6).abs() < 1e-9);
    assert_eq!(merged.sample_count, 10);
}

#[tokio::test]
async fn test_mixing_policies_on_one_store_is_rejected() {
    let store: Arc<dyn SummaryStore> = Arc::new(MemorySummaryStore::new());

    let additive = MergeEngine::attach(store.clone(), EngineConfig::default())
        .await
        .unwrap();
    additive
        .merge_batch(window(1, 2), vec![batch_row("x", 4.0, 1, ts(2, 1, 0))])
        .await
        .unwrap();

    let averaging = EngineConfig::with_policy(CombinePolicy::new(
        CounterMode::Averaging,
        RatingMode::Unweighted,
    ));
    let result = MergeEngine::attach(store, averaging).await;
    assert!(matches!(
        result,
        Err(processor::EngineError::PolicyMismatch { .. })
    ));
}
