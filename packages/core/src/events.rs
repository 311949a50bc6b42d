//! Event types for observing scheduler activity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Job, JobId, JobType};

/// Events emitted by the scheduler as jobs move through their lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JobEvent {
    /// A new job was enqueued.
    JobEnqueued { job: Job, timestamp: DateTime<Utc> },
    /// A job was dequeued and handed to its executor.
    JobStarted {
        job_id: JobId,
        job_type: JobType,
        attempt: u32,
        timestamp: DateTime<Utc>,
    },
    /// A job completed successfully.
    JobCompleted {
        job_id: JobId,
        job_type: JobType,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    /// An attempt failed.
    JobFailed {
        job_id: JobId,
        job_type: JobType,
        error: String,
        attempts: u32,
        will_retry: bool,
        timestamp: DateTime<Utc>,
    },
    /// A failed job went back to pending.
    JobRetrying {
        job_id: JobId,
        attempt: u32,
        /// Earliest instant the retry may run, when a backoff applies.
        not_before: Option<DateTime<Utc>>,
        timestamp: DateTime<Utc>,
    },
    /// A job record was removed by cancellation. Carries the final snapshot.
    JobCancelled { job: Job, timestamp: DateTime<Utc> },
    /// A cleanup sweep removed terminal jobs.
    JobsCleanedUp {
        removed: usize,
        timestamp: DateTime<Utc>,
    },
    /// An executor was registered for a job type.
    ExecutorRegistered {
        job_type: JobType,
        replaced: bool,
        timestamp: DateTime<Utc>,
    },
}

impl JobEvent {
    /// Get the timestamp of the event.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            JobEvent::JobEnqueued { timestamp, .. } => *timestamp,
            JobEvent::JobStarted { timestamp, .. } => *timestamp,
            JobEvent::JobCompleted { timestamp, .. } => *timestamp,
            JobEvent::JobFailed { timestamp, .. } => *timestamp,
            JobEvent::JobRetrying { timestamp, .. } => *timestamp,
            JobEvent::JobCancelled { timestamp, .. } => *timestamp,
            JobEvent::JobsCleanedUp { timestamp, .. } => *timestamp,
            JobEvent::ExecutorRegistered { timestamp, .. } => *timestamp,
        }
    }

    /// Get the job ID associated with this event, if any.
    pub fn job_id(&self) -> Option<JobId> {
        match self {
            JobEvent::JobEnqueued { job, .. } => Some(job.id),
            JobEvent::JobStarted { job_id, .. } => Some(*job_id),
            JobEvent::JobCompleted { job_id, .. } => Some(*job_id),
            JobEvent::JobFailed { job_id, .. } => Some(*job_id),
            JobEvent::JobRetrying { job_id, .. } => Some(*job_id),
            JobEvent::JobCancelled { job, .. } => Some(job.id),
            JobEvent::JobsCleanedUp { .. } | JobEvent::ExecutorRegistered { .. } => None,
        }
    }

    /// Get a short description of this event for logging.
    pub fn description(&self) -> String {
        match self {
            JobEvent::JobEnqueued { job, .. } => {
                format!("Job {} ({}, {}) enqueued", job.id, job.job_type, job.priority)
            }
            JobEvent::JobStarted {
                job_id, attempt, ..
            } => format!("Job {} started (attempt {})", job_id, attempt),
            JobEvent::JobCompleted {
                job_id,
                duration_ms,
                ..
            } => format!("Job {} completed in {}ms", job_id, duration_ms),
            JobEvent::JobFailed {
                job_id,
                error,
                will_retry,
                ..
            } => {
                let retry = if *will_retry { " (will retry)" } else { "" };
                format!("Job {} failed: {}{}", job_id, error, retry)
            }
            JobEvent::JobRetrying {
                job_id, attempt, ..
            } => format!("Job {} retrying (attempt {})", job_id, attempt),
            JobEvent::JobCancelled { job, .. } => {
                format!("Job {} cancelled while {}", job.id, job.status)
            }
            JobEvent::JobsCleanedUp { removed, .. } => {
                format!("Cleanup removed {} jobs", removed)
            }
            JobEvent::ExecutorRegistered {
                job_type, replaced, ..
            } => {
                let verb = if *replaced { "replaced" } else { "registered" };
                format!("Executor for {} {}", job_type, verb)
            }
        }
    }
}
