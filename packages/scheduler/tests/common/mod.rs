#![allow(dead_code)]

use std::error::Error;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use scheduler::{FnExecutor, Job, JobExecutor, JobId, JobScheduler, JobType};
use serde_json::json;
use tokio::sync::Notify;
use tokio::time::Instant;

const WAIT_LIMIT: Duration = Duration::from_secs(5);

/// Poll until the job satisfies `predicate`.
pub async fn wait_for<P>(
    scheduler: &JobScheduler,
    job_id: JobId,
    predicate: P,
) -> Result<Job, Box<dyn Error>>
where
    P: Fn(&Job) -> bool,
{
    let deadline = Instant::now() + WAIT_LIMIT;
    loop {
        if let Some(job) = scheduler.get(job_id).await?
            && predicate(&job)
        {
            return Ok(job);
        }
        if Instant::now() >= deadline {
            return Err(format!("job {} never reached the expected state", job_id).into());
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Echoes the payload back and counts calls.
pub fn succeed(job_type: JobType, calls: Arc<AtomicU32>) -> impl JobExecutor {
    FnExecutor::new(job_type, move |job: &Job| {
        calls.fetch_add(1, Ordering::SeqCst);
        let payload = job.data.payload.clone();
        Box::pin(async move { Ok::<_, String>(json!({ "echo": payload })) })
    })
}

/// Fails every time with "boom".
pub fn always_fail(job_type: JobType, calls: Arc<AtomicU32>) -> impl JobExecutor {
    FnExecutor::new(job_type, move |_job: &Job| {
        calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move { Err::<serde_json::Value, _>("boom".to_string()) })
    })
}

/// Fails on the first call and succeeds on every later one.
pub fn fail_once(job_type: JobType, calls: Arc<AtomicU32>) -> impl JobExecutor {
    FnExecutor::new(job_type, move |_job: &Job| {
        let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
        Box::pin(async move {
            if call == 1 {
                Err("transient OCR outage".to_string())
            } else {
                Ok(json!({ "pages": 12 }))
            }
        })
    })
}

/// Records the order in which jobs are executed.
pub fn recording(job_type: JobType, order: Arc<Mutex<Vec<JobId>>>) -> impl JobExecutor {
    FnExecutor::new(job_type, move |job: &Job| {
        order
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(job.id);
        Box::pin(async move { Ok::<_, String>(json!("done")) })
    })
}

/// Blocks until `release` is notified.
pub fn gated(job_type: JobType, release: Arc<Notify>) -> impl JobExecutor {
    FnExecutor::new(job_type, move |_job: &Job| {
        let release = release.clone();
        Box::pin(async move {
            release.notified().await;
            Ok::<_, String>(json!("released"))
        })
    })
}

/// Sleeps for `delay` before succeeding.
pub fn slow(job_type: JobType, delay: Duration) -> impl JobExecutor {
    FnExecutor::new(job_type, move |_job: &Job| {
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            Ok::<_, String>(json!("slow"))
        })
    })
}
