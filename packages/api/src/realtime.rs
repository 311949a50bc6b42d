//! Server-Sent Events framing for the scheduler's event stream.

use scheduler::JobScheduler;
use scheduler_core::JobEvent;
use tokio::sync::broadcast;

/// Subscribe to a scheduler's lifecycle events.
///
/// Slow consumers see `RecvError::Lagged` rather than stalling the scheduler.
pub fn subscribe_events(scheduler: &JobScheduler) -> broadcast::Receiver<JobEvent> {
    scheduler.subscribe()
}

/// Render one event as an SSE frame, named after its `event` tag.
pub fn format_sse_event(event: &JobEvent) -> String {
    let body = match serde_json::to_value(event) {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!("Failed to serialize event: {}", e);
            return String::new();
        }
    };
    let name = body["event"].as_str().unwrap_or("message").to_string();
    format!("event: {}\ndata: {}\n\n", name, body)
}
