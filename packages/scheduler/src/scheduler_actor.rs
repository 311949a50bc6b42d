//! Scheduler actor: owns every job record and drives execution.
//!
//! All record mutation happens inside [`SchedulerActor::handle`], so the
//! actor's mailbox is the only synchronisation the records need. Executors run
//! on spawned tasks and report back with `ExecutionFinished`; until then the
//! single-flight slot stays occupied and no other job is started.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use ractor::{Actor, ActorProcessingErr, ActorRef};
use scheduler_core::{
    Clock, EnqueueOptions, Job, JobData, JobEvent, JobId, JobStatus, JobType, SchedulerConfig,
    SchedulerError,
};
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::handler::{ExecutorRegistry, ExecutorResult, JobExecutor};
use crate::messages::SchedulerMessage;
use crate::selector::select_next;
use crate::store::JobStore;

/// The job currently holding the single-flight slot.
#[derive(Debug, Clone, Copy)]
struct InFlight {
    job_id: JobId,
    attempt_started: DateTime<Utc>,
}

/// Background timers started by `Start`.
struct Timers {
    tick: JoinHandle<()>,
    cleanup: JoinHandle<()>,
}

impl Timers {
    fn abort(self) {
        self.tick.abort();
        self.cleanup.abort();
    }
}

/// Arguments for spawning the scheduler actor.
pub struct SchedulerArgs {
    pub config: SchedulerConfig,
    pub executors: ExecutorRegistry,
    pub clock: Arc<dyn Clock>,
    pub event_tx: broadcast::Sender<JobEvent>,
}

/// State for the scheduler actor.
pub struct SchedulerState {
    config: SchedulerConfig,
    clock: Arc<dyn Clock>,
    store: JobStore,
    executors: ExecutorRegistry,
    in_flight: Option<InFlight>,
    /// Earliest instant a backed-off retry may run.
    not_before: HashMap<JobId, DateTime<Utc>>,
    timers: Option<Timers>,
    event_tx: broadcast::Sender<JobEvent>,
}

impl SchedulerState {
    fn new(args: SchedulerArgs) -> Self {
        Self {
            config: args.config,
            clock: args.clock,
            store: JobStore::new(),
            executors: args.executors,
            in_flight: None,
            not_before: HashMap::new(),
            timers: None,
            event_tx: args.event_tx,
        }
    }

    /// Broadcast an event. Having no subscribers is fine.
    fn broadcast(&self, event: JobEvent) {
        tracing::trace!("{}", event.description());
        let _ = self.event_tx.send(event);
    }

    fn enqueue(&mut self, job_type: JobType, payload: Value, options: EnqueueOptions) -> JobId {
        let now = self.clock.now();
        let data = JobData {
            payload,
            metadata: options.metadata,
        };
        let job = Job::new(job_type, data, now)
            .with_priority(options.priority)
            .with_max_attempts(
                options
                    .max_attempts
                    .unwrap_or(self.config.default_max_attempts),
            );

        tracing::debug!(
            "Enqueued job {} ({}, priority {})",
            job.id,
            job.job_type,
            job.priority
        );
        self.broadcast(JobEvent::JobEnqueued {
            job: job.clone(),
            timestamp: now,
        });
        self.store.insert(job)
    }

    fn cancel(&mut self, job_id: JobId) -> Result<Job, SchedulerError> {
        let status = self
            .store
            .get(job_id)
            .map(|job| job.status)
            .ok_or(SchedulerError::JobNotFound(job_id))?;

        if status == JobStatus::Processing {
            return Err(SchedulerError::CancellationRejected { job_id, status });
        }

        let job = self
            .store
            .remove(job_id)
            .ok_or(SchedulerError::JobNotFound(job_id))?;
        self.not_before.remove(&job_id);

        tracing::info!("Cancelled job {} ({})", job_id, status);
        self.broadcast(JobEvent::JobCancelled {
            job: job.clone(),
            timestamp: self.clock.now(),
        });
        Ok(job)
    }

    fn cleanup(&mut self, older_than: Duration) -> usize {
        let now = self.clock.now();
        let cutoff = TimeDelta::from_std(older_than)
            .ok()
            .and_then(|age| now.checked_sub_signed(age))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let removed = self.store.remove_terminal_before(cutoff);
        for id in &removed {
            self.not_before.remove(id);
        }

        if !removed.is_empty() {
            tracing::info!(
                "Cleanup removed {} terminal jobs older than {:?}",
                removed.len(),
                older_than
            );
            self.broadcast(JobEvent::JobsCleanedUp {
                removed: removed.len(),
                timestamp: now,
            });
        }
        removed.len()
    }

    fn register(&mut self, executor: Arc<dyn JobExecutor>) -> bool {
        let job_type = executor.job_type();
        let replaced = self.executors.register_arc(executor);
        if replaced {
            tracing::warn!("Replacing registered executor for {}", job_type);
        } else {
            tracing::info!("Registered executor for {}", job_type);
        }
        self.broadcast(JobEvent::ExecutorRegistered {
            job_type,
            replaced,
            timestamp: self.clock.now(),
        });
        replaced
    }

    /// Warn once per job type whose pending jobs have nobody to run them.
    fn warn_starving_types(&self) {
        let starving: BTreeSet<JobType> = self
            .store
            .pending()
            .map(|(job, _)| job.job_type)
            .filter(|t| !self.executors.has_executor(*t))
            .collect();

        for job_type in starving {
            tracing::warn!(
                "{}; jobs of this type stay pending",
                SchedulerError::NoWorkerRegistered(job_type)
            );
        }
    }

    /// Pick the next eligible job and mark it processing.
    ///
    /// No-op while another job holds the slot.
    fn start_next(&mut self) -> Option<(Job, Arc<dyn JobExecutor>)> {
        self.warn_starving_types();
        if self.in_flight.is_some() {
            return None;
        }

        let now = self.clock.now();
        let next = select_next(self.store.pending().filter(|(job, _)| {
            self.executors.has_executor(job.job_type)
                && self.not_before.get(&job.id).is_none_or(|at| *at <= now)
        }))?;

        let Some(job) = self.store.get_mut(next) else {
            tracing::error!("Selected job {} vanished from the store", next);
            return None;
        };
        let Some(executor) = self.executors.get(job.job_type) else {
            tracing::error!("Executor for {} vanished after selection", job.job_type);
            return None;
        };

        job.status = JobStatus::Processing;
        job.started_at.get_or_insert(now);
        job.attempts = job.attempts.saturating_add(1);
        let snapshot = job.clone();

        self.not_before.remove(&next);
        self.in_flight = Some(InFlight {
            job_id: next,
            attempt_started: now,
        });

        tracing::debug!(
            "Starting job {} ({}), attempt {}/{}",
            snapshot.id,
            snapshot.job_type,
            snapshot.attempts,
            snapshot.max_attempts
        );
        self.broadcast(JobEvent::JobStarted {
            job_id: snapshot.id,
            job_type: snapshot.job_type,
            attempt: snapshot.attempts,
            timestamp: now,
        });

        Some((snapshot, executor))
    }

    /// Record an execution outcome and release the single-flight slot.
    fn finish(&mut self, job_id: JobId, outcome: ExecutorResult) {
        let in_flight = self.in_flight.take();
        if in_flight.map(|f| f.job_id) != Some(job_id) {
            tracing::error!(
                "Execution of {} finished but {:?} held the slot",
                job_id,
                in_flight.map(|f| f.job_id)
            );
        }

        let now = self.clock.now();
        let backoff = self.config.backoff;
        let Some(job) = self.store.get_mut(job_id) else {
            tracing::error!("Finished job {} is no longer in the store", job_id);
            return;
        };

        match outcome {
            Ok(result) => {
                job.status = JobStatus::Completed;
                job.result = Some(result);
                job.error = None;
                job.progress = 100;
                job.completed_at = Some(now);

                let attempt_started = in_flight.map_or(now, |f| f.attempt_started);
                let duration_ms = (now - attempt_started).num_milliseconds().max(0) as u64;
                tracing::info!("Job {} ({}) completed", job_id, job.job_type);

                let job_type = job.job_type;
                self.broadcast(JobEvent::JobCompleted {
                    job_id,
                    job_type,
                    duration_ms,
                    timestamp: now,
                });
            }
            Err(error) => {
                job.error = Some(error.clone());
                let will_retry = job.has_attempts_left();
                let attempts = job.attempts;
                let job_type = job.job_type;

                let not_before = if will_retry {
                    job.status = JobStatus::Pending;
                    let delay = backoff.delay_for(attempts);
                    (!delay.is_zero()).then(|| {
                        TimeDelta::from_std(delay)
                            .ok()
                            .and_then(|d| now.checked_add_signed(d))
                            .unwrap_or(DateTime::<Utc>::MAX_UTC)
                    })
                } else {
                    job.status = JobStatus::Failed;
                    job.completed_at = Some(now);
                    None
                };

                if will_retry {
                    tracing::warn!(
                        "Job {} ({}) failed attempt {}/{}: {}",
                        job_id,
                        job_type,
                        attempts,
                        job.max_attempts,
                        error
                    );
                } else {
                    tracing::error!(
                        "Job {} ({}) failed permanently after {} attempts: {}",
                        job_id,
                        job_type,
                        attempts,
                        error
                    );
                }

                self.broadcast(JobEvent::JobFailed {
                    job_id,
                    job_type,
                    error,
                    attempts,
                    will_retry,
                    timestamp: now,
                });

                if will_retry {
                    if let Some(at) = not_before {
                        self.not_before.insert(job_id, at);
                    }
                    self.broadcast(JobEvent::JobRetrying {
                        job_id,
                        attempt: attempts + 1,
                        not_before,
                        timestamp: now,
                    });
                }
            }
        }
    }

    fn start_timers(&mut self, myself: &ActorRef<SchedulerMessage>) -> bool {
        if self.timers.is_some() {
            return false;
        }

        let tick_every = self.config.tick_interval();
        let tick_ref = myself.clone();
        let tick = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + tick_every, tick_every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if tick_ref
                    .send_message(SchedulerMessage::Tick { reply: None })
                    .is_err()
                {
                    break;
                }
            }
        });

        let sweep_every = self.config.cleanup_interval();
        let retention = self.config.retention();
        let sweep_ref = myself.clone();
        let cleanup = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + sweep_every, sweep_every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if sweep_ref
                    .send_message(SchedulerMessage::Cleanup {
                        older_than: retention,
                        reply: None,
                    })
                    .is_err()
                {
                    break;
                }
            }
        });

        tracing::info!(
            "Scheduler timers started (tick every {:?}, cleanup every {:?})",
            tick_every,
            sweep_every
        );
        self.timers = Some(Timers { tick, cleanup });
        true
    }

    fn stop_timers(&mut self) -> bool {
        match self.timers.take() {
            Some(timers) => {
                timers.abort();
                tracing::info!("Scheduler timers stopped");
                true
            }
            None => false,
        }
    }
}

/// Run one job on its own task and report the outcome back to the actor.
///
/// The executor gets a nested task so that a panic surfaces as a `JoinError`
/// instead of taking the reporter down with it.
fn spawn_execution(
    myself: ActorRef<SchedulerMessage>,
    job: Job,
    executor: Arc<dyn JobExecutor>,
    timeout: Option<Duration>,
) {
    tokio::spawn(async move {
        let job_id = job.id;
        let mut run = tokio::spawn(executor.execute(&job));

        let joined = match timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut run).await {
                Ok(joined) => joined,
                Err(_) => {
                    run.abort();
                    Ok(Err(format!(
                        "Job timed out after {}ms",
                        limit.as_millis()
                    )))
                }
            },
            None => run.await,
        };

        let outcome = joined.unwrap_or_else(|e| {
            let reason = if e.is_panic() {
                "Worker panicked"
            } else {
                "Worker task was cancelled"
            };
            tracing::error!(
                "Job {}: {}",
                job_id,
                SchedulerError::WorkerExecution(reason.to_string())
            );
            Err(reason.to_string())
        });

        if myself
            .send_message(SchedulerMessage::ExecutionFinished { job_id, outcome })
            .is_err()
        {
            tracing::debug!("Scheduler stopped before job {} reported back", job_id);
        }
    });
}

/// Scheduler actor that owns the job store and the single execution slot.
pub struct SchedulerActor;

impl SchedulerActor {
    fn try_run_next(myself: &ActorRef<SchedulerMessage>, state: &mut SchedulerState) -> Option<JobId> {
        let (job, executor) = state.start_next()?;
        let job_id = job.id;
        spawn_execution(myself.clone(), job, executor, state.config.job_timeout());
        Some(job_id)
    }
}

impl Actor for SchedulerActor {
    type Msg = SchedulerMessage;
    type State = SchedulerState;
    type Arguments = SchedulerArgs;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!(
            "Starting job scheduler with executors for {:?}",
            args.executors.job_types()
        );
        Ok(SchedulerState::new(args))
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        state.stop_timers();
        tracing::info!("Job scheduler stopped");
        Ok(())
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            SchedulerMessage::Enqueue {
                job_type,
                payload,
                options,
                reply,
            } => {
                let job_id = state.enqueue(job_type, payload, options);
                let _ = reply.send(job_id);
                Self::try_run_next(&myself, state);
            }

            SchedulerMessage::GetJob { job_id, reply } => {
                let _ = reply.send(state.store.get(job_id).cloned());
            }

            SchedulerMessage::ListJobs { filter, reply } => {
                let _ = reply.send(state.store.list(&filter));
            }

            SchedulerMessage::GetStats { reply } => {
                let _ = reply.send(state.store.stats(state.executors.job_types()));
            }

            SchedulerMessage::CancelJob { job_id, reply } => {
                let _ = reply.send(state.cancel(job_id));
            }

            SchedulerMessage::Cleanup { older_than, reply } => {
                let removed = state.cleanup(older_than);
                if let Some(reply) = reply {
                    let _ = reply.send(removed);
                }
            }

            SchedulerMessage::RegisterExecutor { executor, reply } => {
                let _ = reply.send(state.register(executor));
            }

            SchedulerMessage::Start { reply } => {
                let _ = reply.send(state.start_timers(&myself));
            }

            SchedulerMessage::Stop { reply } => {
                let _ = reply.send(state.stop_timers());
            }

            SchedulerMessage::Tick { reply } => {
                let started = Self::try_run_next(&myself, state);
                if let Some(reply) = reply {
                    let _ = reply.send(started);
                }
            }

            SchedulerMessage::ExecutionFinished { job_id, outcome } => {
                state.finish(job_id, outcome);
            }

            SchedulerMessage::Shutdown => {
                tracing::info!("Shutting down job scheduler");
                state.stop_timers();
                myself.stop(None);
            }
        }

        Ok(())
    }
}
