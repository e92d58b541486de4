//! Per-task interval loop.
//!
//! Each enabled scraper gets one of these. The loop owns its own schedule
//! state; nothing is shared across tasks except the health tracker and
//! the shutdown flag. Waiting happens in bounded slices so a shutdown
//! signal is observed within [`SLEEP_SLICE`] regardless of interval
//! length.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::FutureExt;
use tokio::time::Instant;

use pricewatch_core::Runnable;
use pricewatch_core::config::ScheduleEntry;
use pricewatch_health::HealthTracker;

use crate::runner;

/// Upper bound on one uninterruptible sleep; also the shutdown latency bound.
pub const SLEEP_SLICE: Duration = Duration::from_secs(10);

/// Pause after a loop-bookkeeping failure before retrying.
const BOOKKEEPING_BACKOFF: Duration = Duration::from_secs(60);

/// Run one task on its recurring interval until shutdown.
///
/// The next due time derives from the previous completion, so a run that
/// overruns its interval shifts the schedule rather than triggering
/// catch-up runs. Task failures are absorbed by the runner boundary; a
/// panic escaping the loop's own bookkeeping is logged and the loop
/// retries after a fixed backoff instead of exiting.
pub async fn run_task_loop(
    job: Arc<dyn Runnable>,
    entry: ScheduleEntry,
    health: HealthTracker,
    shutdown: Arc<AtomicBool>,
) {
    let interval = Duration::from_secs(entry.interval_minutes * 60);
    tracing::info!(
        "📅 Scheduling {} to run every {}",
        job.name(),
        format_interval(entry.interval_minutes)
    );

    let mut last_run: Option<Instant> = None;

    if entry.run_immediately && !shutdown.load(Ordering::SeqCst) {
        tracing::info!("Running {} immediately on startup", job.name());
        runner::run_scraper_safe(&job, &health).await;
        last_run = Some(Instant::now());
    }

    while !shutdown.load(Ordering::SeqCst) {
        let cycle =
            AssertUnwindSafe(run_cycle(&job, interval, &mut last_run, &health, &shutdown))
                .catch_unwind()
                .await;

        match cycle {
            Ok(true) => {}
            Ok(false) => break,
            Err(_) => {
                tracing::error!(
                    "Error in scraper loop for {}; retrying in {}s",
                    job.name(),
                    BOOKKEEPING_BACKOFF.as_secs()
                );
                if sleep_with_shutdown(BOOKKEEPING_BACKOFF, &shutdown).await {
                    break;
                }
            }
        }
    }

    tracing::info!("Scraper loop for {} stopped", job.name());
}

/// One IDLE → DUE → RUNNING cycle. Returns `false` when shutdown was
/// observed before the run started.
async fn run_cycle(
    job: &Arc<dyn Runnable>,
    interval: Duration,
    last_run: &mut Option<Instant>,
    health: &HealthTracker,
    shutdown: &AtomicBool,
) -> bool {
    // A task that has never run is due now; otherwise one interval after
    // the previous completion. An overdue task runs exactly once.
    let next_due = match *last_run {
        Some(completed) => completed + interval,
        None => Instant::now(),
    };
    let wait = next_due.saturating_duration_since(Instant::now());

    if !wait.is_zero() {
        tracing::info!(
            "Next run of {} in {}",
            job.name(),
            format_interval(wait.as_secs() / 60)
        );
        if sleep_with_shutdown(wait, shutdown).await {
            return false;
        }
    }

    if shutdown.load(Ordering::SeqCst) {
        return false;
    }

    runner::run_scraper_safe(job, health).await;
    *last_run = Some(Instant::now());
    true
}

/// Sleep for `duration` in bounded slices, re-checking the shutdown flag
/// between slices. Returns `true` if shutdown was observed.
pub async fn sleep_with_shutdown(duration: Duration, shutdown: &AtomicBool) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if shutdown.load(Ordering::SeqCst) {
            return true;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return false;
        }
        tokio::time::sleep(SLEEP_SLICE.min(remaining)).await;
    }
}

fn format_interval(minutes: u64) -> String {
    if minutes < 60 {
        let plural = if minutes == 1 { "" } else { "s" };
        return format!("{minutes} minute{plural}");
    }
    if minutes % 60 == 0 {
        let hours = minutes / 60;
        let plural = if hours == 1 { "" } else { "s" };
        format!("{hours} hour{plural}")
    } else {
        format!("{:.1} hours", minutes as f64 / 60.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pricewatch_core::{PricewatchError, Result};
    use std::sync::Mutex;

    struct RecordingJob {
        name: String,
        duration: Duration,
        fail: bool,
        runs: Arc<Mutex<Vec<(Instant, Instant)>>>,
    }

    impl RecordingJob {
        fn new(name: &str, duration: Duration, fail: bool) -> (Arc<dyn Runnable>, Arc<Mutex<Vec<(Instant, Instant)>>>) {
            let runs = Arc::new(Mutex::new(Vec::new()));
            let job = Arc::new(Self {
                name: name.to_string(),
                duration,
                fail,
                runs: runs.clone(),
            });
            (job, runs)
        }
    }

    #[async_trait]
    impl Runnable for RecordingJob {
        fn name(&self) -> &str {
            &self.name
        }
        async fn run(&self) -> Result<()> {
            let started = Instant::now();
            if !self.duration.is_zero() {
                tokio::time::sleep(self.duration).await;
            }
            self.runs.lock().unwrap().push((started, Instant::now()));
            if self.fail {
                Err(PricewatchError::Scrape("simulated failure".into()))
            } else {
                Ok(())
            }
        }
    }

    fn entry(interval_minutes: u64, run_immediately: bool) -> ScheduleEntry {
        ScheduleEntry {
            enabled: true,
            interval_minutes,
            run_immediately,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_at_one_minute_ticks() {
        let (job, runs) = RecordingJob::new("A", Duration::ZERO, false);
        let health = HealthTracker::new();
        let shutdown = Arc::new(AtomicBool::new(false));
        let start = Instant::now();

        let handle = tokio::spawn(run_task_loop(
            job,
            entry(1, true),
            health.clone(),
            shutdown.clone(),
        ));

        tokio::time::sleep(Duration::from_secs(125)).await;
        shutdown.store(true, Ordering::SeqCst);
        handle.await.unwrap();

        let runs = runs.lock().unwrap();
        assert_eq!(runs.len(), 3);
        let offsets: Vec<u64> = runs
            .iter()
            .map(|(started, _)| started.duration_since(start).as_secs())
            .collect();
        assert_eq!(offsets, vec![0, 60, 120]);

        let snap = health.snapshot();
        assert_eq!(snap.total_runs, 3);
        assert_eq!(snap.successful_runs, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_task_records_errors() {
        let (job, _runs) = RecordingJob::new("B", Duration::ZERO, true);
        let health = HealthTracker::new();
        let shutdown = Arc::new(AtomicBool::new(false));

        let handle = tokio::spawn(run_task_loop(
            job,
            entry(1, true),
            health.clone(),
            shutdown.clone(),
        ));

        tokio::time::sleep(Duration::from_secs(125)).await;
        shutdown.store(true, Ordering::SeqCst);
        handle.await.unwrap();

        let snap = health.snapshot();
        assert_eq!(snap.failed_runs, 3);
        assert_eq!(snap.successful_runs, 0);
        assert_eq!(snap.recent_errors.len(), 3);
        assert!(snap.recent_errors.iter().all(|e| e.scraper == "B"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_tasks_independent_intervals() {
        let (job_a, runs_a) = RecordingJob::new("A", Duration::ZERO, false);
        let (job_b, runs_b) = RecordingJob::new("B", Duration::ZERO, false);
        let health = HealthTracker::new();
        let shutdown = Arc::new(AtomicBool::new(false));

        let handle_a = tokio::spawn(run_task_loop(
            job_a,
            entry(1, true),
            health.clone(),
            shutdown.clone(),
        ));
        let handle_b = tokio::spawn(run_task_loop(
            job_b,
            entry(5, true),
            health.clone(),
            shutdown.clone(),
        ));

        // Both run at t=0.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(runs_a.lock().unwrap().len(), 1);
        assert_eq!(runs_b.lock().unwrap().len(), 1);

        // At t=1m only A has run again.
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(runs_a.lock().unwrap().len(), 2);
        assert_eq!(runs_b.lock().unwrap().len(), 1);

        // At t=5m both have run again.
        tokio::time::sleep(Duration::from_secs(240)).await;
        assert_eq!(runs_a.lock().unwrap().len(), 6);
        assert_eq!(runs_b.lock().unwrap().len(), 2);

        shutdown.store(true, Ordering::SeqCst);
        handle_a.await.unwrap();
        handle_b.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_run_never_overlaps_and_shifts_schedule() {
        // 90s run against a 60s interval.
        let (job, runs) = RecordingJob::new("slow", Duration::from_secs(90), false);
        let health = HealthTracker::new();
        let shutdown = Arc::new(AtomicBool::new(false));
        let start = Instant::now();

        let handle = tokio::spawn(run_task_loop(
            job,
            entry(1, true),
            health.clone(),
            shutdown.clone(),
        ));

        tokio::time::sleep(Duration::from_secs(250)).await;
        shutdown.store(true, Ordering::SeqCst);
        handle.await.unwrap();

        let runs = runs.lock().unwrap();
        assert_eq!(runs.len(), 2);
        // Sequential: each run starts after the previous one finished.
        assert!(runs[1].0 >= runs[0].1);
        // Drift: second run starts one interval after the first completed,
        // not at the originally intended slot.
        assert_eq!(runs[1].0.duration_since(start).as_secs(), 150);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_mid_wait_within_one_slice() {
        let (job, runs) = RecordingJob::new("idle", Duration::ZERO, false);
        let health = HealthTracker::new();
        let shutdown = Arc::new(AtomicBool::new(false));

        // Hour-long interval: after the first due-now run the loop sits in
        // IDLE for the rest of the hour.
        let handle = tokio::spawn(run_task_loop(
            job,
            entry(60, false),
            health,
            shutdown.clone(),
        ));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(runs.lock().unwrap().len(), 1);
        shutdown.store(true, Ordering::SeqCst);

        // The flag is observed at the next slice boundary.
        tokio::time::timeout(SLEEP_SLICE + Duration::from_secs(1), handle)
            .await
            .expect("loop did not stop within one slice")
            .unwrap();
        assert_eq!(runs.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_consecutive_runs_at_least_one_interval_apart() {
        let (job, runs) = RecordingJob::new("spacing", Duration::ZERO, false);
        let health = HealthTracker::new();
        let shutdown = Arc::new(AtomicBool::new(false));

        let handle = tokio::spawn(run_task_loop(
            job,
            entry(2, false),
            health,
            shutdown.clone(),
        ));

        tokio::time::sleep(Duration::from_secs(500)).await;
        shutdown.store(true, Ordering::SeqCst);
        handle.await.unwrap();

        let runs = runs.lock().unwrap();
        assert!(runs.len() >= 2);
        for pair in runs.windows(2) {
            let gap = pair[1].0.duration_since(pair[0].0);
            assert!(gap >= Duration::from_secs(120) - SLEEP_SLICE);
        }
    }

    #[test]
    fn test_format_interval() {
        assert_eq!(format_interval(1), "1 minute");
        assert_eq!(format_interval(45), "45 minutes");
        assert_eq!(format_interval(60), "1 hour");
        assert_eq!(format_interval(120), "2 hours");
        assert_eq!(format_interval(90), "1.5 hours");
    }
}
