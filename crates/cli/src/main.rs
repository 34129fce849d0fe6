//! Review rollup CLI
//!
//! Drives the incremental per-entity review summary: merge windows of a
//! review feed into a summary store, then report on the result.

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use review_rollup_cli::{
    commands::{CommandContext, ReportCommand, RunCommand, ShowCommand},
    output::{OutputFormat, Printer},
};
use review_rollup_config::{ObservabilityConfig, RollupConfig};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "review-rollup",
    version,
    about = "Incremental per-entity review summaries",
    long_about = "Aggregates a review feed one time window at a time and merges each \
                  window's per-entity aggregates into a persistent summary table."
)]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, value_name = "FILE", env = "ROLLUP_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "table")]
    output: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge a schedule of windows from a review feed
    Run(RunCommand),

    /// Print totals and per-day tables for a persistent store
    Report(ReportCommand),

    /// Print one entity's summary
    Show(ShowCommand),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config =
        RollupConfig::load(cli.config.clone()).context("loading rollup configuration")?;
    if let Commands::Run(command) = &cli.command {
        command.apply_overrides(&mut config);
    }
    config.validate()?;

    init_tracing(&config.observability, cli.verbose);

    let ctx = CommandContext {
        config,
        printer: Printer::new(cli.output),
    };

    match &cli.command {
        Commands::Run(command) => command.execute(&ctx).await?,
        Commands::Report(command) => command.execute(&ctx).await?,
        Commands::Show(command) => command.execute(&ctx).await?,
    }

    Ok(())
}

/// Initialize tracing/logging
///
/// `RUST_LOG` wins over the configured level; `--verbose` raises the
/// default to debug.
fn init_tracing(observability: &ObservabilityConfig, verbose: bool) {
    let default_level = if verbose {
        "debug"
    } else {
        observability.log_level.as_str()
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(filter);
    if observability.json_logging {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
