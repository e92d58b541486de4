//! Single-run execution with an isolating error boundary.
//!
//! Everything a task can throw (network failures, parse errors, missing
//! data, alert-delivery failures, even panics) is converted to a failed
//! outcome here. Nothing crosses this boundary, which is what keeps one
//! task's failure away from its siblings and from the loop itself.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use pricewatch_core::Runnable;
use pricewatch_health::{HealthTracker, RunStatus};

/// Outcome of one isolated task execution.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Success,
    Failure(String),
}

/// Execute a task, absorbing errors and panics.
pub async fn run_job(job: &Arc<dyn Runnable>) -> RunOutcome {
    match AssertUnwindSafe(job.run()).catch_unwind().await {
        Ok(Ok(())) => RunOutcome::Success,
        Ok(Err(e)) => RunOutcome::Failure(e.to_string()),
        Err(panic) => RunOutcome::Failure(panic_message(panic.as_ref())),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("task panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("task panicked: {message}")
    } else {
        "task panicked".to_string()
    }
}

/// Execute a task and record its outcome with the health tracker.
///
/// Returns whether the run succeeded. Never propagates anything.
pub async fn run_scraper_safe(job: &Arc<dyn Runnable>, health: &HealthTracker) -> bool {
    let name = job.name().to_string();
    tracing::info!("Starting {name} scraper...");

    match run_job(job).await {
        RunOutcome::Success => {
            tracing::info!("Successfully completed {name} scraper");
            health.record(&name, RunStatus::Success, None);
            true
        }
        RunOutcome::Failure(message) => {
            tracing::error!("Error running {name} scraper: {message}");
            health.record(&name, RunStatus::Failure, Some(&message));
            false
        }
    }
}
