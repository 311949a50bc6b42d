//! Core domain types for the background job scheduler.
//!
//! This crate contains shared types used across all packages:
//! - Job, JobStatus and Priority for work items
//! - SchedulerConfig and RetryBackoff for tuning
//! - Clock for injectable time
//! - Events for observing the lifecycle

mod clock;
mod config;
mod error;
mod events;
mod job;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    DEFAULT_CLEANUP_INTERVAL_MS, DEFAULT_EVENT_CAPACITY, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_RETENTION_MS, DEFAULT_TICK_INTERVAL_MS, RetryBackoff, SchedulerConfig,
};
pub use error::SchedulerError;
pub use events::JobEvent;
pub use job::{
    EnqueueOptions, Job, JobData, JobFilter, JobId, JobStats, JobStatus, JobType, ParseEnumError,
    Priority,
};
