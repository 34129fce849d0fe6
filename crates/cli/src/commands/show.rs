//! Show command - print one entity's summary row

use clap::Args;
use processor::SummaryStore;
use std::path::PathBuf;

use super::{open_persistent_store, CommandContext};
use crate::{CliError, CliResult};

#[derive(Args, Debug, Clone)]
pub struct ShowCommand {
    /// Entity id to look up
    pub entity_id: String,

    /// Sled store directory (overrides store.path)
    #[arg(long, value_name = "DIR")]
    pub store_path: Option<PathBuf>,
}

impl ShowCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> CliResult<()> {
        let store = open_persistent_store(&ctx.config.store, self.store_path.clone()).await?;

        match store.get(&self.entity_id).await? {
            Some(summary) => ctx.printer.entity(&summary),
            None => Err(CliError::NotFound(format!(
                "no summary for entity '{}'",
                self.entity_id
            ))),
        }
    }
}
