//! Boundary functions for the job scheduler.
//!
//! This crate contains everything a transport layer needs:
//! - Job management (enqueue, get, list, cancel, cleanup)
//! - Real-time events (SSE formatting)
//! - Scheduler and tracing initialization

mod dto;
mod error;
mod init;
mod jobs;
mod logging;
mod realtime;

pub use dto::*;
pub use error::ApiError;
pub use init::init_job_scheduler;
pub use jobs::*;
pub use logging::init_tracing;
pub use realtime::*;

// Re-export core types for convenience
pub use scheduler_core::{
    Job, JobEvent, JobId, JobStats, JobStatus, JobType, Priority, SchedulerConfig,
};
