//! Run command - aggregate and merge a schedule of windows
//!
//! Windows come from `--window`/`--tumbling` flags, falling back to the
//! configuration file. Each window is merged to completion and reported
//! before the next one is aggregated.

use chrono::Duration;
use clap::{Args, ValueEnum};
use colored::Colorize;
use processor::config::StoreBackend;
use processor::merge::{CounterMode, RatingMode};
use processor::window::{parse_instant, WindowBounds, WindowSchedule};
use processor::{
    BatchOutcome, CounterAggregate, EngineError, EventLogAggregator, MergeEngine, MetricsRegistry,
    RollupMetrics, RollupPipeline,
};
use review_rollup_config::RollupConfig;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::CommandContext;
use crate::output::Printer;
use crate::{CliError, CliResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    Memory,
    Sled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CounterModeArg {
    Additive,
    Averaging,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RatingModeArg {
    Unweighted,
    Weighted,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunCommand {
    /// JSON-lines review feed (overrides source.events_path)
    #[arg(long, short = 'e', value_name = "FILE")]
    pub events: Option<PathBuf>,

    /// Batch window, repeatable, in the order to merge
    #[arg(long = "window", short = 'w', value_name = "START,END")]
    pub windows: Vec<WindowBounds>,

    /// Fixed-size windows covering a range
    #[arg(long, value_name = "FROM,TO,HOURS", conflicts_with = "windows")]
    pub tumbling: Option<String>,

    /// Summary store backend
    #[arg(long, value_enum)]
    pub store: Option<StoreKind>,

    /// Sled store directory
    #[arg(long, value_name = "DIR")]
    pub store_path: Option<PathBuf>,

    /// Counter combine mode
    #[arg(long, value_enum)]
    pub counter_mode: Option<CounterModeArg>,

    /// Rating combine mode
    #[arg(long, value_enum)]
    pub rating_mode: Option<RatingModeArg>,

    /// Rows merged concurrently within a batch
    #[arg(long)]
    pub parallelism: Option<usize>,

    /// Print totals and per-day tables after every window
    #[arg(long)]
    pub report: bool,

    /// Print Prometheus metrics after the run
    #[arg(long)]
    pub metrics: bool,
}

impl RunCommand {
    /// Fold command-line overrides into the loaded configuration
    pub fn apply_overrides(&self, config: &mut RollupConfig) {
        if let Some(events) = &self.events {
            config.source.events_path = Some(events.clone());
        }
        match self.store {
            Some(StoreKind::Memory) => config.store.backend = StoreBackend::Memory,
            Some(StoreKind::Sled) => config.store.backend = StoreBackend::Sled,
            None => {}
        }
        if let Some(path) = &self.store_path {
            config.store.backend = StoreBackend::Sled;
            config.store.path = Some(path.clone());
        }
        if let Some(mode) = self.counter_mode {
            config.engine.counter_mode = match mode {
                CounterModeArg::Additive => CounterMode::Additive,
                CounterModeArg::Averaging => CounterMode::Averaging,
            };
        }
        if let Some(mode) = self.rating_mode {
            config.engine.rating_mode = match mode {
                RatingModeArg::Unweighted => RatingMode::Unweighted,
                RatingModeArg::Weighted => RatingMode::Weighted,
            };
        }
        if let Some(parallelism) = self.parallelism {
            config.engine.parallelism = parallelism;
        }
        if self.metrics {
            config.observability.print_metrics = true;
        }
    }

    /// Windows from the command line, falling back to the configuration
    pub fn schedule(&self, config: &RollupConfig) -> CliResult<WindowSchedule> {
        if !self.windows.is_empty() {
            return WindowSchedule::from_windows(self.windows.clone())
                .map_err(|e| CliError::InvalidInput(e.to_string()));
        }
        if let Some(spec) = &self.tumbling {
            return parse_tumbling(spec);
        }
        Ok(config.windows.schedule()?)
    }

    pub async fn execute(&self, ctx: &CommandContext) -> CliResult<()> {
        let config = &ctx.config;
        let printer = ctx.printer;

        let schedule = self.schedule(config)?;
        if schedule.is_empty() {
            return Err(CliError::InvalidInput(
                "no windows to process: pass --window or --tumbling, or set windows in the config"
                    .to_string(),
            ));
        }
        for (previous, next) in schedule.discontinuities() {
            warn!(%previous, %next, "Window schedule is not contiguous");
        }

        let events_path = config.source.events_path.clone().ok_or_else(|| {
            CliError::InvalidInput("no event feed: pass --events or set source.events_path".to_string())
        })?;
        let aggregator = EventLogAggregator::from_json_lines(
            &events_path,
            CounterAggregate::from(config.engine.counter_mode),
        )
        .await?;

        let store = config.store.open().await?;
        let registry = MetricsRegistry::new();
        let engine = MergeEngine::attach(store, config.engine.clone())
            .await?
            .with_metrics(RollupMetrics::new(&registry));
        info!(policy = %engine.policy(), windows = schedule.len(), "Starting rollup");

        let pipeline = RollupPipeline::new(aggregator, engine).with_reporting(self.report);

        let cancel = CancellationToken::new();
        let signal_token = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping after in-flight rows");
                signal_token.cancel();
            }
        });

        let mut printed: CliResult<()> = Ok(());
        let run = pipeline
            .run_each(&schedule, &cancel, |outcome| {
                if printed.is_ok() {
                    printed = print_outcome(printer, outcome);
                }
            })
            .await;
        printed?;
        if let Err(EngineError::BatchAborted { report, .. }) = &run {
            printer.merge_report(report)?;
        }
        run?;

        pipeline.engine().store().flush().await?;
        printer.stats(&pipeline.stats())?;

        if config.observability.print_metrics {
            let text = registry
                .encode()
                .map_err(|e| CliError::InvalidInput(e.to_string()))?;
            println!();
            println!("{}", "Metrics".bold().cyan());
            print!("{text}");
        }

        Ok(())
    }
}

fn print_outcome(printer: Printer, outcome: &BatchOutcome) -> CliResult<()> {
    printer.merge_report(&outcome.merge)?;
    if let Some(summary) = &outcome.summary {
        printer.summary_report(summary)?;
    }
    Ok(())
}

/// Parse `FROM,TO,HOURS` into a tumbling schedule
pub fn parse_tumbling(spec: &str) -> CliResult<WindowSchedule> {
    let parts: Vec<&str> = spec.split(',').map(str::trim).collect();
    let [from, to, hours] = parts.as_slice() else {
        return Err(CliError::InvalidInput(format!(
            "--tumbling expects FROM,TO,HOURS, got '{spec}'"
        )));
    };

    let from = parse_instant(from)
        .ok_or_else(|| CliError::InvalidInput(format!("bad tumbling start '{from}'")))?;
    let to = parse_instant(to)
        .ok_or_else(|| CliError::InvalidInput(format!("bad tumbling end '{to}'")))?;
    let size = hours
        .parse::<i64>()
        .ok()
        .and_then(Duration::try_hours)
        .ok_or_else(|| CliError::InvalidInput(format!("bad tumbling size '{hours}'")))?;

    WindowSchedule::tumbling(from, to, size)
        .map_err(|e| CliError::InvalidInput(e.to_string()))
}
