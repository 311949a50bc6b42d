//! Error taxonomy shared by the scheduler and its callers.

use crate::{JobId, JobStatus, JobType};

/// Errors raised by scheduler operations.
///
/// `JobNotFound` and `CancellationRejected` are definite negative answers;
/// the public handle turns them into `None`/`false` instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    #[error("No worker registered for job type: {0}")]
    NoWorkerRegistered(JobType),

    #[error("Worker execution failed: {0}")]
    WorkerExecution(String),

    #[error("Cannot cancel job {job_id} while {status}")]
    CancellationRejected { job_id: JobId, status: JobStatus },

    #[error("Scheduler unavailable: {0}")]
    Unavailable(String),
}
