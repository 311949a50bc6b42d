//! Scheduler configuration and retry backoff strategies.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TICK_INTERVAL_MS: u64 = 2_000;
pub const DEFAULT_CLEANUP_INTERVAL_MS: u64 = 30 * 60 * 1_000;
pub const DEFAULT_RETENTION_MS: u64 = 60 * 60 * 1_000;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Delay applied between a failed attempt and the next one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum RetryBackoff {
    /// Eligible again on the very next tick.
    #[default]
    Immediate,
    /// Fixed wait after every failure.
    Constant { delay_ms: u64 },
    /// `base * 2^(attempt-1)`, capped at `max`, optionally with full jitter.
    Exponential {
        base_ms: u64,
        max_ms: u64,
        jitter: bool,
    },
}

impl RetryBackoff {
    /// Delay before the attempt following `attempt` (1-based) may run.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match *self {
            RetryBackoff::Immediate => Duration::ZERO,
            RetryBackoff::Constant { delay_ms } => Duration::from_millis(delay_ms),
            RetryBackoff::Exponential {
                base_ms,
                max_ms,
                jitter,
            } => {
                let shift = attempt.saturating_sub(1).min(32);
                let capped = base_ms.saturating_mul(1u64 << shift).min(max_ms);
                let ms = if jitter && capped > 0 {
                    rand::thread_rng().gen_range(0..=capped)
                } else {
                    capped
                };
                Duration::from_millis(ms)
            }
        }
    }
}

/// Configuration for scheduler timers and job defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Period of the scheduling tick.
    pub tick_interval_ms: u64,
    /// Period of the automatic cleanup sweep.
    pub cleanup_interval_ms: u64,
    /// Age after which terminal jobs are swept by the periodic cleanup.
    pub retention_ms: u64,
    /// Attempt budget when the caller does not supply one.
    pub default_max_attempts: u32,
    /// Upper bound on a single execution. `None` waits forever.
    ///
    /// On expiry the executor task is aborted, which only takes effect at its
    /// next `.await`. A blocking or CPU-bound executor keeps running after the
    /// slot is released and may overlap with the next job.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_timeout_ms: Option<u64>,
    pub backoff: RetryBackoff,
    /// Buffer size of the event broadcast channel.
    pub event_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            cleanup_interval_ms: DEFAULT_CLEANUP_INTERVAL_MS,
            retention_ms: DEFAULT_RETENTION_MS,
            default_max_attempts: DEFAULT_MAX_ATTEMPTS,
            job_timeout_ms: None,
            backoff: RetryBackoff::Immediate,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl SchedulerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `SCHEDULER_TICK_INTERVAL_MS` | `2000` | Scheduling tick period |
    /// | `SCHEDULER_CLEANUP_INTERVAL_MS` | `1800000` | Cleanup sweep period |
    /// | `SCHEDULER_RETENTION_MS` | `3600000` | Terminal job retention |
    /// | `SCHEDULER_DEFAULT_MAX_ATTEMPTS` | `3` | Attempt budget |
    /// | `SCHEDULER_JOB_TIMEOUT_MS` | unset | Per-execution timeout |
    /// | `SCHEDULER_EVENT_CAPACITY` | `1024` | Event channel buffer |
    pub fn from_env() -> Self {
        fn var<T: std::str::FromStr>(name: &str) -> Option<T> {
            std::env::var(name).ok().and_then(|v| v.parse::<T>().ok())
        }

        let defaults = Self::default();
        Self {
            tick_interval_ms: var("SCHEDULER_TICK_INTERVAL_MS")
                .unwrap_or(defaults.tick_interval_ms)
                .max(1),
            cleanup_interval_ms: var("SCHEDULER_CLEANUP_INTERVAL_MS")
                .unwrap_or(defaults.cleanup_interval_ms)
                .max(1),
            retention_ms: var("SCHEDULER_RETENTION_MS").unwrap_or(defaults.retention_ms),
            default_max_attempts: var("SCHEDULER_DEFAULT_MAX_ATTEMPTS")
                .unwrap_or(defaults.default_max_attempts)
                .max(1),
            job_timeout_ms: var("SCHEDULER_JOB_TIMEOUT_MS"),
            backoff: defaults.backoff,
            event_capacity: var("SCHEDULER_EVENT_CAPACITY")
                .unwrap_or(defaults.event_capacity)
                .max(1),
        }
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval_ms = (interval.as_millis() as u64).max(1);
        self
    }

    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval_ms = (interval.as_millis() as u64).max(1);
        self
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention_ms = retention.as_millis() as u64;
        self
    }

    pub fn with_default_max_attempts(mut self, max_attempts: u32) -> Self {
        self.default_max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn with_backoff(mut self, backoff: RetryBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Tick period, never shorter than 1ms.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    /// Cleanup period, never shorter than 1ms.
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms.max(1))
    }

    pub fn retention(&self) -> Duration {
        Duration::from_millis(self.retention_ms)
    }

    pub fn job_timeout(&self) -> Option<Duration> {
        self.job_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = SchedulerConfig::default();
        assert_eq!(config.tick_interval(), Duration::from_secs(2));
        assert_eq!(config.cleanup_interval(), Duration::from_secs(30 * 60));
        assert_eq!(config.retention(), Duration::from_secs(3600));
        assert_eq!(config.default_max_attempts, 3);
        assert_eq!(config.backoff, RetryBackoff::Immediate);
        assert!(config.job_timeout().is_none());
    }

    #[test]
    fn immediate_backoff_never_waits() {
        assert_eq!(RetryBackoff::Immediate.delay_for(1), Duration::ZERO);
        assert_eq!(RetryBackoff::Immediate.delay_for(10), Duration::ZERO);
    }

    #[test]
    fn exponential_backoff_doubles_up_to_cap() {
        let backoff = RetryBackoff::Exponential {
            base_ms: 100,
            max_ms: 1_000,
            jitter: false,
        };
        assert_eq!(backoff.delay_for(1), Duration::from_millis(100));
        assert_eq!(backoff.delay_for(2), Duration::from_millis(200));
        assert_eq!(backoff.delay_for(4), Duration::from_millis(800));
        assert_eq!(backoff.delay_for(5), Duration::from_millis(1_000));
        assert_eq!(backoff.delay_for(60), Duration::from_millis(1_000));
    }

    #[test]
    fn jitter_stays_within_cap() {
        let backoff = RetryBackoff::Exponential {
            base_ms: 50,
            max_ms: 400,
            jitter: true,
        };
        for attempt in 1..8 {
            assert!(backoff.delay_for(attempt) <= Duration::from_millis(400));
        }
    }

    #[test]
    fn config_deserializes_partial_documents() {
        let config: SchedulerConfig = serde_json::from_str(
            r#"{"tick_interval_ms": 50, "backoff": {"strategy": "constant", "delay_ms": 10}}"#,
        )
        .expect("config");
        assert_eq!(config.tick_interval_ms, 50);
        assert_eq!(config.backoff, RetryBackoff::Constant { delay_ms: 10 });
        assert_eq!(config.retention_ms, DEFAULT_RETENTION_MS);
    }

    #[test]
    fn zero_intervals_from_documents_are_raised_to_one_millisecond() {
        let config: SchedulerConfig =
            serde_json::from_str(r#"{"tick_interval_ms": 0, "cleanup_interval_ms": 0}"#)
                .expect("config");
        assert_eq!(config.tick_interval(), Duration::from_millis(1));
        assert_eq!(config.cleanup_interval(), Duration::from_millis(1));
    }
}
