//! Job management functions.
//!
//! Each function takes the scheduler instance explicitly; the transport that
//! exposes them (HTTP, RPC, CLI) lives outside this crate.

use std::time::Duration;

use scheduler::JobScheduler;
use scheduler_core::{EnqueueOptions, Job, JobFilter, JobId, JobStatus, JobType, Priority};

use crate::dto::{
    CancelResponse, CleanupRequest, CleanupResponse, EnqueueRequest, EnqueueResponse,
    JobListResponse, ListJobsQuery,
};
use crate::error::ApiError;

const DEFAULT_CLEANUP_HOURS: f64 = 1.0;

fn invalid(e: impl std::fmt::Display) -> ApiError {
    ApiError::InvalidRequest(e.to_string())
}

fn parse_job_id(id: &str) -> Result<JobId, ApiError> {
    JobId::parse(id).map_err(|e| ApiError::InvalidRequest(format!("Invalid job ID: {}", e)))
}

/// Enqueue a new job.
pub async fn enqueue_job(
    scheduler: &JobScheduler,
    request: EnqueueRequest,
) -> Result<EnqueueResponse, ApiError> {
    let job_type = request.job_type.parse::<JobType>().map_err(invalid)?;
    let priority = request
        .priority
        .as_deref()
        .map(str::parse::<Priority>)
        .transpose()
        .map_err(invalid)?
        .unwrap_or_default();

    let mut options = EnqueueOptions::default()
        .with_priority(priority)
        .with_metadata(request.metadata.unwrap_or_default());
    if let Some(max_attempts) = request.max_attempts {
        options = options.with_max_attempts(max_attempts);
    }

    let job_id = scheduler.enqueue(job_type, request.data, options).await?;
    Ok(EnqueueResponse { job_id })
}

/// Get a job by ID.
pub async fn get_job(scheduler: &JobScheduler, id: &str) -> Result<Option<Job>, ApiError> {
    let job_id = parse_job_id(id)?;
    Ok(scheduler.get(job_id).await?)
}

/// List jobs with optional status and type filters, plus overall stats.
pub async fn list_jobs(
    scheduler: &JobScheduler,
    query: ListJobsQuery,
) -> Result<JobListResponse, ApiError> {
    let filter = JobFilter {
        status: query
            .status
            .as_deref()
            .map(str::parse::<JobStatus>)
            .transpose()
            .map_err(invalid)?,
        job_type: query
            .job_type
            .as_deref()
            .map(str::parse::<JobType>)
            .transpose()
            .map_err(invalid)?,
        limit: None,
    };

    let jobs = scheduler.list(filter).await?;
    let stats = scheduler.stats().await?;
    Ok(JobListResponse { jobs, stats })
}

/// Cancel a job that is not currently processing.
pub async fn cancel_job(scheduler: &JobScheduler, id: &str) -> Result<CancelResponse, ApiError> {
    let job_id = parse_job_id(id)?;
    let success = scheduler.cancel(job_id).await?;
    Ok(CancelResponse { success })
}

/// Remove terminal jobs older than the requested age.
pub async fn cleanup_jobs(
    scheduler: &JobScheduler,
    request: CleanupRequest,
) -> Result<CleanupResponse, ApiError> {
    let hours = request.older_than_hours.unwrap_or(DEFAULT_CLEANUP_HOURS);
    let older_than = Duration::try_from_secs_f64(hours * 3600.0)
        .map_err(|_| invalid(format!("olderThanHours must be a non-negative number, got {}", hours)))?;

    let removed = scheduler.cleanup(older_than).await?;
    tracing::info!("Manual cleanup removed {} jobs older than {}h", removed, hours);
    Ok(CleanupResponse {
        removed,
        message: format!("Cleaned up jobs older than {} hours", hours),
    })
}
