//! Runs a scheduler with demo executors for every job type and logs its events.
//!
//! ```text
//! RUST_LOG=debug cargo run -p api --bin scheduler-demo
//! ```

use std::time::Duration;

use api::{CleanupRequest, EnqueueRequest, init_job_scheduler, init_tracing};
use scheduler::{ExecutorRegistry, FnExecutor, Job, JobExecutor, JobType, SchedulerConfig};
use serde_json::json;

fn demo_executor(job_type: JobType, work: Duration) -> impl JobExecutor {
    FnExecutor::new(job_type, move |job: &Job| {
        let payload = job.data.payload.clone();
        let attempt = job.attempts;
        Box::pin(async move {
            tokio::time::sleep(work).await;
            // Documents flagged as flaky fail their first attempt.
            if payload.get("flaky").and_then(|v| v.as_bool()) == Some(true) && attempt == 1 {
                return Err("document service unavailable".to_string());
            }
            Ok(json!({
                "summary": format!("{} finished", job_type),
                "input": payload,
            }))
        })
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = SchedulerConfig::from_env();
    tracing::info!(?config, "Starting scheduler demo");

    let mut executors = ExecutorRegistry::new();
    for job_type in JobType::ALL {
        executors.register(demo_executor(job_type, Duration::from_millis(300)));
    }

    let scheduler = init_job_scheduler(config, executors).await?;

    let mut events = api::subscribe_events(&scheduler);
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            tracing::info!("{}", event.description());
        }
    });

    let requests = [
        ("document-analysis", "low", json!({"document": "spec-sheet.pdf", "flaky": true})),
        ("clash-detection", "critical", json!({"model": "tower-a.ifc"})),
        ("cost-estimation", "medium", json!({"boq": "level-3"})),
        ("compliance-check", "high", json!({"code": "IBC-2021"})),
    ];
    for (job_type, priority, data) in requests {
        let response = api::enqueue_job(
            &scheduler,
            EnqueueRequest {
                job_type: job_type.to_string(),
                data,
                priority: Some(priority.to_string()),
                max_attempts: None,
                metadata: None,
            },
        )
        .await?;
        tracing::info!("Enqueued {} job {}", job_type, response.job_id);
    }

    tracing::info!("Press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;

    let cleaned = api::cleanup_jobs(&scheduler, CleanupRequest::default()).await?;
    tracing::info!("{}", cleaned.message);
    scheduler.shutdown()?;
    Ok(())
}
