//! Service lifecycle: signal handling, loop startup, and clean shutdown.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use pricewatch_core::config::ScheduleEntry;
use pricewatch_core::{PricewatchConfig, Result, Runnable};
use pricewatch_health::{HealthServer, HealthTracker};

use crate::loops;
use crate::runner;

/// Drives one interval loop per registered task and coordinates shutdown.
///
/// The health tracker is injected at construction and handed to every
/// loop; the shutdown flag is the only other shared state.
pub struct SchedulerService {
    tasks: Vec<(ScheduleEntry, Arc<dyn Runnable>)>,
    health: HealthTracker,
    shutdown: Arc<AtomicBool>,
}

impl SchedulerService {
    pub fn new(health: HealthTracker) -> Self {
        Self {
            tasks: Vec::new(),
            health,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn add_task(&mut self, entry: ScheduleEntry, job: Arc<dyn Runnable>) {
        self.tasks.push((entry, job));
    }

    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    /// Request cancellation of every loop. Idempotent and non-blocking;
    /// runs already in progress are allowed to complete.
    pub fn request_shutdown(&self) {
        if !self.shutdown.swap(true, Ordering::SeqCst) {
            tracing::info!("Stopping scheduler...");
        }
    }

    /// Spawn all enabled task loops and wait for them to finish.
    ///
    /// Returns once every loop has observed the shutdown flag and exited.
    /// Loops run concurrently, so total shutdown latency stays within one
    /// sleep slice, not one per task.
    pub async fn run(&self) {
        let mut handles = Vec::new();

        for (entry, job) in &self.tasks {
            if !entry.enabled {
                tracing::info!("Scraper {} is disabled", job.name());
                continue;
            }
            tracing::info!("Started scheduler task for {}", job.name());
            handles.push(tokio::spawn(loops::run_task_loop(
                job.clone(),
                *entry,
                self.health.clone(),
                self.shutdown.clone(),
            )));
        }

        if handles.is_empty() {
            tracing::warn!("No scrapers are enabled. Exiting...");
            return;
        }

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!("Scraper loop task failed: {e}");
            }
        }
    }
}

/// Install SIGINT/SIGTERM handlers that set the shutdown flag exactly
/// once. The handler task never blocks the runtime.
pub fn install_signal_handlers(shutdown: Arc<AtomicBool>) {
    tokio::spawn(async move {
        let signal_name = wait_for_signal().await;
        if !shutdown.swap(true, Ordering::SeqCst) {
            tracing::info!("Received {signal_name}. Initiating graceful shutdown...");
        }
    });
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!("Failed to install SIGTERM handler: {e}");
            let _ = tokio::signal::ctrl_c().await;
            return "interrupt";
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => "interrupt",
        _ = terminate.recv() => "terminate",
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    let _ = tokio::signal::ctrl_c().await;
    "interrupt"
}

/// Run the full service: health server first, then every enabled loop,
/// until a shutdown signal arrives.
///
/// Only a health-server startup failure is fatal here; everything the
/// tasks do is isolated per loop.
pub async fn run_service(
    config: &PricewatchConfig,
    tasks: Vec<(ScheduleEntry, Arc<dyn Runnable>)>,
) -> Result<()> {
    tracing::info!("⏰ Price alert scheduler starting");

    if !config.email.is_complete() {
        tracing::warn!("Email configuration is not properly set. Alerts may not work.");
    }

    let health = HealthTracker::new();

    let server = if config.service.health_enabled {
        Some(HealthServer::start(config.service.health_port, health.clone()).await?)
    } else {
        None
    };

    let mut service = SchedulerService::new(health);
    for (entry, job) in tasks {
        service.add_task(entry, job);
    }

    install_signal_handlers(service.shutdown_flag());
    service.run().await;

    if let Some(server) = server {
        server.stop().await;
    }
    tracing::info!("Scheduler stopped");
    Ok(())
}

/// Run every task once, sequentially. Returns whether all runs succeeded.
pub async fn run_single_pass(tasks: &[Arc<dyn Runnable>]) -> bool {
    tracing::info!("Running scrapers in single-pass mode");
    let health = HealthTracker::new();

    let mut success_count = 0u32;
    let mut failure_count = 0u32;
    for job in tasks {
        if runner::run_scraper_safe(job, &health).await {
            success_count += 1;
        } else {
            failure_count += 1;
        }
    }

    tracing::info!("Single pass complete. Success: {success_count}, Failures: {failure_count}");
    failure_count == 0
}
