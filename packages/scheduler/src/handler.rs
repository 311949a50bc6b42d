//! Job executor trait and registry.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use scheduler_core::{Job, JobType};
use serde_json::Value;

/// Result type for job executors. The error string is recorded on the job.
pub type ExecutorResult = Result<Value, String>;

/// Future type for async job executors.
pub type ExecutorFuture = Pin<Box<dyn Future<Output = ExecutorResult> + Send>>;

/// Trait for job executors.
///
/// Implement this trait to define how jobs of a specific type are processed.
/// Executors report binary success or failure; the scheduler owns retries.
pub trait JobExecutor: Send + Sync + 'static {
    /// The job type this executor processes.
    fn job_type(&self) -> JobType;

    /// Process a job and return the result.
    fn execute(&self, job: &Job) -> ExecutorFuture;
}

/// Registry mapping each job type to its single executor.
///
/// Registering a second executor for a type replaces the first.
#[derive(Default, Clone)]
pub struct ExecutorRegistry {
    executors: HashMap<JobType, Arc<dyn JobExecutor>>,
}

impl ExecutorRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            executors: HashMap::new(),
        }
    }

    /// Register an executor. Returns `true` when it replaced an existing one.
    pub fn register<E: JobExecutor>(&mut self, executor: E) -> bool {
        self.register_arc(Arc::new(executor))
    }

    /// Register an already shared executor.
    pub fn register_arc(&mut self, executor: Arc<dyn JobExecutor>) -> bool {
        self.executors
            .insert(executor.job_type(), executor)
            .is_some()
    }

    /// Builder-style registration.
    pub fn with<E: JobExecutor>(mut self, executor: E) -> Self {
        self.register(executor);
        self
    }

    /// Get the executor for a job type.
    pub fn get(&self, job_type: JobType) -> Option<Arc<dyn JobExecutor>> {
        self.executors.get(&job_type).cloned()
    }

    /// Check if an executor exists for a job type.
    pub fn has_executor(&self, job_type: JobType) -> bool {
        self.executors.contains_key(&job_type)
    }

    /// List all registered job types, sorted.
    pub fn job_types(&self) -> Vec<JobType> {
        let mut types: Vec<JobType> = self.executors.keys().copied().collect();
        types.sort();
        types
    }
}

impl std::fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorRegistry")
            .field("job_types", &self.job_types())
            .finish()
    }
}

/// A simple function-based job executor.
pub struct FnExecutor<F>
where
    F: Fn(&Job) -> ExecutorFuture + Send + Sync + 'static,
{
    job_type: JobType,
    executor: F,
}

impl<F> FnExecutor<F>
where
    F: Fn(&Job) -> ExecutorFuture + Send + Sync + 'static,
{
    /// Create a new function-based executor.
    pub fn new(job_type: JobType, executor: F) -> Self {
        Self { job_type, executor }
    }
}

impl<F> JobExecutor for FnExecutor<F>
where
    F: Fn(&Job) -> ExecutorFuture + Send + Sync + 'static,
{
    fn job_type(&self) -> JobType {
        self.job_type
    }

    fn execute(&self, job: &Job) -> ExecutorFuture {
        (self.executor)(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use scheduler_core::JobData;
    use serde_json::json;

    fn constant(job_type: JobType, value: Value) -> impl JobExecutor {
        FnExecutor::new(job_type, move |_job: &Job| {
            let value = value.clone();
            Box::pin(async move { Ok::<_, String>(value) })
        })
    }

    #[tokio::test]
    async fn last_registration_wins() {
        let mut registry = ExecutorRegistry::new();
        assert!(!registry.register(constant(JobType::CostEstimation, json!(1))));
        assert!(registry.register(constant(JobType::CostEstimation, json!(2))));

        let job = Job::new(JobType::CostEstimation, JobData::default(), Utc::now());
        let executor = registry.get(JobType::CostEstimation).expect("executor");
        assert_eq!(executor.execute(&job).await, Ok(json!(2)));
    }

    #[test]
    fn job_types_are_sorted_and_deduplicated() {
        let registry = ExecutorRegistry::new()
            .with(constant(JobType::ComplianceCheck, Value::Null))
            .with(constant(JobType::DocumentAnalysis, Value::Null))
            .with(constant(JobType::ComplianceCheck, Value::Null));

        assert_eq!(
            registry.job_types(),
            vec![JobType::DocumentAnalysis, JobType::ComplianceCheck]
        );
        assert!(registry.has_executor(JobType::DocumentAnalysis));
        assert!(!registry.has_executor(JobType::BimAnalysis));
    }
}
