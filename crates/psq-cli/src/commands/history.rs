use anyhow::Context;
use psq_config::PsqConfig;
use psq_store::SupabaseStore;

use crate::cli::GlobalFlags;
use crate::output::output;

const DEFAULT_LIMIT: usize = 50;

/// Handle `psq history`.
pub async fn handle(config: &PsqConfig, flags: &GlobalFlags) -> anyhow::Result<()> {
    let store = SupabaseStore::new(&config.supabase).context("report store unavailable")?;
    let reports = store
        .fetch_recent(flags.limit_or(DEFAULT_LIMIT))
        .await
        .context("failed to load saved reports")?;
    output(&reports, flags.format)
}
