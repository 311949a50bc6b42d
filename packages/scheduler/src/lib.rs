//! Actor-based background job scheduler.
//!
//! This crate provides the Ractor-based runtime that decouples request
//! handling from long-running analysis work.
//!
//! # Architecture
//!
//! - `JobStore` - In-memory job records
//! - `select_next` - Priority + FIFO selection of the next pending job
//! - `ExecutorRegistry` - One executor per job type
//! - `SchedulerActor` - Single-flight execution engine, tick and cleanup timers
//! - `JobScheduler` - Cloneable handle used by callers
//!
//! # Usage
//!
//! ```ignore
//! use scheduler::{ExecutorRegistry, JobScheduler, SchedulerConfig};
//!
//! let (scheduler, _handle) =
//!     JobScheduler::spawn(SchedulerConfig::from_env(), ExecutorRegistry::new()).await?;
//! scheduler.start().await?;
//! let job_id = scheduler
//!     .enqueue(JobType::ClashDetection, payload, EnqueueOptions::default())
//!     .await?;
//! ```

mod handle;
mod handler;
mod messages;
mod scheduler_actor;
pub mod selector;
mod store;

pub use handle::JobScheduler;
pub use handler::{ExecutorFuture, ExecutorRegistry, ExecutorResult, FnExecutor, JobExecutor};
pub use messages::SchedulerMessage;
pub use scheduler_actor::SchedulerActor;
pub use store::JobStore;

// Re-export core types for convenience
pub use scheduler_core::{
    Clock, EnqueueOptions, Job, JobData, JobEvent, JobFilter, JobId, JobStats, JobStatus, JobType,
    ManualClock, Priority, RetryBackoff, SchedulerConfig, SchedulerError, SystemClock,
};
