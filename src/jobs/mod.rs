//! Background job scheduling

pub mod retention_cleanup;

use std::time::Duration;

use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::info;

use crate::AppState;

/// Initialize and start the job scheduler.
/// Only called when the cleanup interval is configured (> 0 hours).
pub async fn start_scheduler(state: AppState) -> anyhow::Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let interval = Duration::from_secs(state.config.run_interval_hours * 3600);
    let cleanup_job = Job::new_repeated_async(interval, move |_uuid, _l| {
        let state = state.clone();
        Box::pin(async move {
            if let Err(e) = retention_cleanup::run(state).await {
                tracing::error!("Scheduled cleanup error: {}", e);
            }
        })
    })?;
    scheduler.add(cleanup_job).await?;

    scheduler.start().await?;

    info!("Job scheduler started");
    Ok(scheduler)
}
