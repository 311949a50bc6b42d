//! Message types for the scheduler actor.

use std::sync::Arc;
use std::time::Duration;

use ractor::RpcReplyPort;
use scheduler_core::{EnqueueOptions, Job, JobFilter, JobId, JobStats, JobType, SchedulerError};
use serde_json::Value;

use crate::handler::{ExecutorResult, JobExecutor};

/// Messages for the SchedulerActor.
pub enum SchedulerMessage {
    /// Create a pending job and immediately try to run something.
    Enqueue {
        job_type: JobType,
        payload: Value,
        options: EnqueueOptions,
        reply: RpcReplyPort<JobId>,
    },

    /// Get a job by ID.
    GetJob {
        job_id: JobId,
        reply: RpcReplyPort<Option<Job>>,
    },

    /// List jobs in scheduling order.
    ListJobs {
        filter: JobFilter,
        reply: RpcReplyPort<Vec<Job>>,
    },

    /// Get job counts.
    GetStats { reply: RpcReplyPort<JobStats> },

    /// Delete a job that is not currently processing. Replies with the removed record.
    CancelJob {
        job_id: JobId,
        reply: RpcReplyPort<Result<Job, SchedulerError>>,
    },

    /// Sweep terminal jobs older than the given age.
    Cleanup {
        older_than: Duration,
        reply: Option<RpcReplyPort<usize>>,
    },

    /// Register or replace the executor for its job type.
    RegisterExecutor {
        executor: Arc<dyn JobExecutor>,
        reply: RpcReplyPort<bool>,
    },

    /// Start the tick and cleanup timers.
    Start { reply: RpcReplyPort<bool> },

    /// Stop the tick and cleanup timers.
    Stop { reply: RpcReplyPort<bool> },

    /// Try to run the next eligible job. Replies with the job started, if any.
    Tick {
        reply: Option<RpcReplyPort<Option<JobId>>>,
    },

    /// An execution task finished.
    ExecutionFinished {
        job_id: JobId,
        outcome: ExecutorResult,
    },

    /// Stop timers and the actor.
    Shutdown,
}

impl std::fmt::Debug for SchedulerMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SchedulerMessage::Enqueue { .. } => "Enqueue",
            SchedulerMessage::GetJob { .. } => "GetJob",
            SchedulerMessage::ListJobs { .. } => "ListJobs",
            SchedulerMessage::GetStats { .. } => "GetStats",
            SchedulerMessage::CancelJob { .. } => "CancelJob",
            SchedulerMessage::Cleanup { .. } => "Cleanup",
            SchedulerMessage::RegisterExecutor { .. } => "RegisterExecutor",
            SchedulerMessage::Start { .. } => "Start",
            SchedulerMessage::Stop { .. } => "Stop",
            SchedulerMessage::Tick { .. } => "Tick",
            SchedulerMessage::ExecutionFinished { .. } => "ExecutionFinished",
            SchedulerMessage::Shutdown => "Shutdown",
        };
        f.write_str(name)
    }
}
