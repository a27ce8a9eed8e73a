pub mod fetch;
pub mod history;
pub mod process;

use psq_config::PsqConfig;

use crate::cli::{Commands, GlobalFlags};

/// Dispatch a parsed command to its handler.
pub async fn dispatch(
    command: Commands,
    config: &PsqConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match command {
        Commands::Fetch(args) => fetch::handle(&args, config, flags).await,
        Commands::Process(args) => process::handle(args, config, flags).await,
        Commands::History => history::handle(config, flags).await,
    }
}
