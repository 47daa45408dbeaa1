//! Scheduled retention cleanup pass

use anyhow::Result;
use tracing::info;

use crate::AppState;
use crate::services::cleanup::run_tagged_pass;

/// Run one tagged cleanup pass. A tick that lands while another pass is
/// still in flight is skipped rather than queued; the next tick proceeds
/// unaffected.
pub async fn run(state: AppState) -> Result<()> {
    let Some(sonarr) = state.sonarr.clone() else {
        anyhow::bail!("Sonarr not configured: set SONARR_API_KEY");
    };

    let Ok(_guard) = state.pass_gate.try_lock() else {
        info!("Cleanup pass already in progress, skipping scheduled tick");
        return Ok(());
    };

    info!("Running scheduled cleanup");
    run_tagged_pass(&sonarr, None, state.config.dry_run).await?;
    Ok(())
}
