//! CLI command implementations

pub mod report;
pub mod run;
pub mod show;

pub use report::ReportCommand;
pub use run::RunCommand;
pub use show::ShowCommand;

use processor::config::{StoreBackend, StoreConfig};
use processor::SummaryStore;
use review_rollup_config::RollupConfig;
use std::path::PathBuf;
use std::sync::Arc;

use crate::output::Printer;
use crate::{CliError, CliResult};

/// Everything a command needs besides its own arguments
pub struct CommandContext {
    pub config: RollupConfig,
    pub printer: Printer,
}

/// Open the persistent store named by the config, or by `path` when given
pub(crate) async fn open_persistent_store(
    config: &StoreConfig,
    path: Option<PathBuf>,
) -> CliResult<Arc<dyn SummaryStore>> {
    let mut config = config.clone();
    if let Some(path) = path {
        config.backend = StoreBackend::Sled;
        config.path = Some(path);
    }

    if config.backend != StoreBackend::Sled || config.path.is_none() {
        return Err(CliError::InvalidInput(
            "a persistent store is required: pass --store-path or set store.backend=sled and store.path"
                .to_string(),
        ));
    }

    Ok(config.open().await?)
}
