//! Rollup pipeline driver
//!
//! Walks a [`WindowSchedule`] in order. For each window it asks the batch
//! aggregator for that window's rows, merges them, and optionally takes a
//! reporting snapshot, all before the next window is requested.
//!
//! # Example
//!
//! ```rust,no_run
//! use processor::aggregation::{CounterAggregate, EventLogAggregator};
//! use processor::config::EngineConfig;
//! use processor::merge::MergeEngine;
//! use processor::pipeline::RollupPipeline;
//! use processor::state::MemorySummaryStore;
//! use processor::window::{WindowBounds, WindowSchedule};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let events = EventLogAggregator::from_json_lines("reviews.jsonl", CounterAggregate::Sum).await?;
//! let engine = MergeEngine::attach(Arc::new(MemorySummaryStore::new()), EngineConfig::default()).await?;
//!
//! let window: WindowBounds = "2018-01-01,2018-02-01".parse()?;
//! let schedule = WindowSchedule::from_windows(vec![window])?;
//!
//! let pipeline = RollupPipeline::new(events, engine).with_reporting(true);
//! for outcome in pipeline.run(&schedule).await? {
//!     println!("{}", outcome.merge);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [`WindowSchedule`]: crate::window::WindowSchedule

mod driver;

pub use driver::{BatchOutcome, PipelineStats, RollupPipeline};
