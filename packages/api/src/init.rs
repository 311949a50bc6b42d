//! Scheduler initialization.

use scheduler::{ExecutorRegistry, JobScheduler};
use scheduler_core::SchedulerConfig;

use crate::error::ApiError;

/// Spawn a scheduler and start its timers.
///
/// This should be called once at server startup before handling requests;
/// the returned handle is what the job functions take.
pub async fn init_job_scheduler(
    config: SchedulerConfig,
    executors: ExecutorRegistry,
) -> Result<JobScheduler, ApiError> {
    tracing::info!("Initializing job scheduler...");

    let (scheduler, _handle) = JobScheduler::spawn(config, executors).await?;
    scheduler.start().await?;

    tracing::info!("Job scheduler initialized");
    Ok(scheduler)
}
