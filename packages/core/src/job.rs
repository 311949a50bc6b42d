//! Job domain types for background work items.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ulid::Ulid;

/// Unique identifier for a job, using ULID for chronological sorting.
///
/// A ULID embeds a millisecond timestamp and 80 random bits, which keeps
/// concurrent enqueues from colliding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Ulid);

impl JobId {
    /// Create a new unique job ID.
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Parse a job ID from a string.
    pub fn parse(s: &str) -> Result<Self, ulid::DecodeError> {
        Ok(Self(Ulid::from_string(s)?))
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Category of work. Used solely to pick an executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobType {
    DocumentAnalysis,
    BimAnalysis,
    ClashDetection,
    CostEstimation,
    ScheduleOptimization,
    ComplianceCheck,
}

impl JobType {
    /// Every job type, in declaration order.
    pub const ALL: [JobType; 6] = [
        JobType::DocumentAnalysis,
        JobType::BimAnalysis,
        JobType::ClashDetection,
        JobType::CostEstimation,
        JobType::ScheduleOptimization,
        JobType::ComplianceCheck,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::DocumentAnalysis => "document-analysis",
            JobType::BimAnalysis => "bim-analysis",
            JobType::ClashDetection => "clash-detection",
            JobType::CostEstimation => "cost-estimation",
            JobType::ScheduleOptimization => "schedule-optimization",
            JobType::ComplianceCheck => "compliance-check",
        }
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("job type", s))
    }
}

/// Priority level for job execution order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    /// Scheduling tier; lower runs first.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Critical => 0,
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "critical" => Ok(Priority::Critical),
            other => Err(ParseEnumError::new("priority", other)),
        }
    }
}

/// Current status of a job in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting to be picked up, either fresh or awaiting a retry.
    #[default]
    Pending,
    /// Currently being executed. At most one job is ever in this state.
    Processing,
    /// Finished successfully.
    Completed,
    /// Exhausted its attempts.
    Failed,
}

impl JobStatus {
    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Get a simple status string for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(ParseEnumError::new("job status", other)),
        }
    }
}

/// Error returned when parsing one of the job enums from a string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Opaque payload plus caller metadata, handed verbatim to the executor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobData {
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl JobData {
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            metadata: Map::new(),
        }
    }
}

/// Caller-supplied knobs for `enqueue`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnqueueOptions {
    pub priority: Priority,
    /// `None` takes the scheduler's configured default.
    pub max_attempts: Option<u32>,
    pub metadata: Map<String, Value>,
}

impl EnqueueOptions {
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A job represents one unit of asynchronous work and its lifecycle state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub status: JobStatus,
    pub priority: Priority,
    pub data: JobData,
    /// Present iff the job completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Last executor error; may be set while the job waits for a retry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub attempts: u32,
    pub max_attempts: u32,
    pub created_at: DateTime<Utc>,
    /// Stamped on first dequeue only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub progress: u8,
}

impl Job {
    /// Create a new pending job.
    pub fn new(job_type: JobType, data: JobData, created_at: DateTime<Utc>) -> Self {
        Self {
            id: JobId::new(),
            job_type,
            status: JobStatus::Pending,
            priority: Priority::default(),
            data,
            result: None,
            error: None,
            attempts: 0,
            max_attempts: 3,
            created_at,
            started_at: None,
            completed_at: None,
            progress: 0,
        }
    }

    /// Set the priority for this job.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the attempt budget. Zero is raised to one so the job runs at least once.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Whether another failure would still leave budget for a retry.
    pub fn has_attempts_left(&self) -> bool {
        self.attempts < self.max_attempts
    }
}

/// Filter options for listing jobs.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    pub job_type: Option<JobType>,
    pub limit: Option<usize>,
}

impl JobFilter {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn job_type(job_type: JobType) -> Self {
        Self {
            job_type: Some(job_type),
            ..Default::default()
        }
    }

    pub fn matches(&self, job: &Job) -> bool {
        self.status.is_none_or(|s| job.status == s)
            && self.job_type.is_none_or(|t| job.job_type == t)
    }
}

/// Counts across every job the scheduler currently holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStats {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
    pub registered_types: Vec<JobType>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn job_serializes_with_wire_field_names() {
        let job = Job::new(
            JobType::ClashDetection,
            JobData::new(json!({"model": "tower-a.ifc"})),
            Utc::now(),
        )
        .with_priority(Priority::High);

        let value = serde_json::to_value(&job).expect("serialize");
        assert_eq!(value["type"], "clash-detection");
        assert_eq!(value["priority"], "high");
        assert_eq!(value["status"], "pending");
        assert_eq!(value["maxAttempts"], 3);
        assert!(value.get("createdAt").is_some());
        assert!(value.get("result").is_none());
        assert!(value.get("startedAt").is_none());
    }

    #[test]
    fn enums_parse_their_display_form() {
        for job_type in JobType::ALL {
            assert_eq!(job_type.to_string().parse::<JobType>(), Ok(job_type));
        }
        assert_eq!("critical".parse::<Priority>(), Ok(Priority::Critical));
        assert!("urgent".parse::<Priority>().is_err());
        assert!("ocr".parse::<JobType>().is_err());
        assert_eq!("failed".parse::<JobStatus>(), Ok(JobStatus::Failed));
    }

    #[test]
    fn priority_rank_puts_critical_first() {
        let mut tiers = [Priority::Low, Priority::Critical, Priority::Medium, Priority::High];
        tiers.sort_by_key(Priority::rank);
        assert_eq!(
            tiers,
            [Priority::Critical, Priority::High, Priority::Medium, Priority::Low]
        );
    }

    #[test]
    fn zero_max_attempts_still_runs_once() {
        let job = Job::new(JobType::CostEstimation, JobData::default(), Utc::now())
            .with_max_attempts(0);
        assert_eq!(job.max_attempts, 1);
        assert!(job.has_attempts_left());
    }

    #[test]
    fn filter_matches_on_status_and_type() {
        let job = Job::new(JobType::BimAnalysis, JobData::default(), Utc::now());
        assert!(JobFilter::default().matches(&job));
        assert!(JobFilter::status(JobStatus::Pending).matches(&job));
        assert!(!JobFilter::status(JobStatus::Failed).matches(&job));
        assert!(!JobFilter::job_type(JobType::ComplianceCheck).matches(&job));
    }
}
