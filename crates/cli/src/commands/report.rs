//! Report command - print totals and per-day tables for a persistent store

use clap::Args;
use processor::{MetricsReporter, SummaryStore};
use std::path::PathBuf;
use tracing::debug;

use super::{open_persistent_store, CommandContext};
use crate::CliResult;

#[derive(Args, Debug, Clone)]
pub struct ReportCommand {
    /// Sled store directory (overrides store.path)
    #[arg(long, value_name = "DIR")]
    pub store_path: Option<PathBuf>,
}

impl ReportCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> CliResult<()> {
        let store = open_persistent_store(&ctx.config.store, self.store_path.clone()).await?;
        let metadata = store.metadata().await?;
        debug!(batches = metadata.batches_merged, "Opened summary store");

        let report = MetricsReporter::snapshot(store.as_ref()).await?;
        ctx.printer.summary_report(&report)
    }
}
