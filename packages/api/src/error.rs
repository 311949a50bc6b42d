//! Errors surfaced at the API boundary.

use scheduler_core::SchedulerError;

/// Errors returned by the job API functions.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}
