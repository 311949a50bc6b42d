//! Public handle for talking to a running scheduler.

use std::sync::Arc;
use std::time::Duration;

use ractor::rpc::CallResult;
use ractor::{Actor, ActorRef, RpcReplyPort};
use scheduler_core::{
    Clock, EnqueueOptions, Job, JobEvent, JobFilter, JobId, JobStats, JobType, SchedulerConfig,
    SchedulerError, SystemClock,
};
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::handler::{ExecutorRegistry, JobExecutor};
use crate::messages::SchedulerMessage;
use crate::scheduler_actor::{SchedulerActor, SchedulerArgs};

/// Cloneable handle to one scheduler instance.
///
/// Every instance owns its own store, executors and timers, so several can
/// live side by side (one per test, for example).
#[derive(Clone)]
pub struct JobScheduler {
    actor: ActorRef<SchedulerMessage>,
    event_tx: broadcast::Sender<JobEvent>,
}

impl JobScheduler {
    /// Spawn a scheduler using wall-clock time. Timers stay off until [`start`](Self::start).
    pub async fn spawn(
        config: SchedulerConfig,
        executors: ExecutorRegistry,
    ) -> Result<(Self, JoinHandle<()>), SchedulerError> {
        Self::spawn_with_clock(config, executors, Arc::new(SystemClock)).await
    }

    /// Spawn a scheduler with an injected clock.
    pub async fn spawn_with_clock(
        config: SchedulerConfig,
        executors: ExecutorRegistry,
        clock: Arc<dyn Clock>,
    ) -> Result<(Self, JoinHandle<()>), SchedulerError> {
        let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));
        let args = SchedulerArgs {
            config,
            executors,
            clock,
            event_tx: event_tx.clone(),
        };

        let (actor, handle) = Actor::spawn(None, SchedulerActor, args)
            .await
            .map_err(|e| SchedulerError::Unavailable(format!("Failed to spawn scheduler: {}", e)))?;

        Ok((Self { actor, event_tx }, handle))
    }

    async fn call<T, F>(&self, build: F) -> Result<T, SchedulerError>
    where
        T: Send + 'static,
        F: FnOnce(RpcReplyPort<T>) -> SchedulerMessage,
    {
        match self.actor.call(build, None).await {
            Ok(CallResult::Success(value)) => Ok(value),
            Ok(CallResult::Timeout) => Err(SchedulerError::Unavailable("call timed out".into())),
            Ok(CallResult::SenderError) => {
                Err(SchedulerError::Unavailable("scheduler dropped the reply".into()))
            }
            Err(_) => Err(SchedulerError::Unavailable(
                "scheduler is not running".into(),
            )),
        }
    }

    /// Create a pending job and trigger an immediate scheduling attempt.
    ///
    /// Returns as soon as the job is recorded; it never waits for execution.
    pub async fn enqueue(
        &self,
        job_type: JobType,
        payload: Value,
        options: EnqueueOptions,
    ) -> Result<JobId, SchedulerError> {
        self.call(|reply| SchedulerMessage::Enqueue {
            job_type,
            payload,
            options,
            reply,
        })
        .await
    }

    /// Get a job by ID. `None` when the ID is unknown.
    pub async fn get(&self, job_id: JobId) -> Result<Option<Job>, SchedulerError> {
        self.call(|reply| SchedulerMessage::GetJob { job_id, reply })
            .await
    }

    /// List jobs, critical first and oldest first within a tier.
    pub async fn list(&self, filter: JobFilter) -> Result<Vec<Job>, SchedulerError> {
        self.call(|reply| SchedulerMessage::ListJobs { filter, reply })
            .await
    }

    pub async fn stats(&self) -> Result<JobStats, SchedulerError> {
        self.call(|reply| SchedulerMessage::GetStats { reply }).await
    }

    /// Delete a job unless it is processing. `false` for unknown or running jobs.
    pub async fn cancel(&self, job_id: JobId) -> Result<bool, SchedulerError> {
        let outcome = self
            .call(|reply| SchedulerMessage::CancelJob { job_id, reply })
            .await?;

        match outcome {
            Ok(_) => Ok(true),
            Err(e @ (SchedulerError::JobNotFound(_) | SchedulerError::CancellationRejected { .. })) => {
                tracing::debug!("{}", e);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Remove terminal jobs that finished at least `older_than` ago.
    pub async fn cleanup(&self, older_than: Duration) -> Result<usize, SchedulerError> {
        self.call(|reply| SchedulerMessage::Cleanup {
            older_than,
            reply: Some(reply),
        })
        .await
    }

    /// Register an executor. Returns `true` if it replaced one for the same type.
    pub async fn register<E: JobExecutor>(&self, executor: E) -> Result<bool, SchedulerError> {
        let executor: Arc<dyn JobExecutor> = Arc::new(executor);
        self.call(|reply| SchedulerMessage::RegisterExecutor { executor, reply })
            .await
    }

    /// Start the tick and cleanup timers. `false` if already running.
    pub async fn start(&self) -> Result<bool, SchedulerError> {
        self.call(|reply| SchedulerMessage::Start { reply }).await
    }

    /// Stop the timers. Queries keep working. `false` if not running.
    pub async fn stop(&self) -> Result<bool, SchedulerError> {
        self.call(|reply| SchedulerMessage::Stop { reply }).await
    }

    /// Run one scheduling attempt now. Returns the job that was started, if any.
    pub async fn tick(&self) -> Result<Option<JobId>, SchedulerError> {
        self.call(|reply| SchedulerMessage::Tick { reply: Some(reply) })
            .await
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.event_tx.subscribe()
    }

    /// Stop the timers and the actor. A job still executing is abandoned.
    pub fn shutdown(&self) -> Result<(), SchedulerError> {
        self.actor
            .send_message(SchedulerMessage::Shutdown)
            .map_err(|_| SchedulerError::Unavailable("scheduler is not running".into()))
    }
}
