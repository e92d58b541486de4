//! Run-history state: per-scraper status, counters, and the error ring.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

/// Recent failures kept for the health report; oldest evicted first.
const ERROR_LOG_CAP: usize = 10;

/// Outcome of one task run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    Failure,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Failure => "failure",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunStatus::Success)
    }
}

/// The latest outcome recorded for one scraper. Never mutated once created.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub scraper: String,
    pub status: RunStatus,
    pub timestamp: DateTime<Utc>,
    pub error: Option<String>,
}

/// One entry in the recent-error ring.
#[derive(Debug, Clone)]
pub struct ErrorEntry {
    pub scraper: String,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

struct HealthInner {
    started_at: DateTime<Utc>,
    last_check: DateTime<Utc>,
    healthy: bool,
    scrapers: HashMap<String, RunRecord>,
    total_runs: u64,
    successful_runs: u64,
    failed_runs: u64,
    recent_errors: VecDeque<ErrorEntry>,
}

/// Cloneable handle to the shared run-history state.
///
/// All mutation goes through [`record`](Self::record); the HTTP handlers
/// only read snapshots. Both operations are infallible: this is
/// observability infrastructure and must never take down the task it
/// observes, so a poisoned lock is recovered rather than propagated.
#[derive(Clone)]
pub struct HealthTracker {
    inner: Arc<Mutex<HealthInner>>,
}

impl HealthTracker {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            inner: Arc::new(Mutex::new(HealthInner {
                started_at: now,
                last_check: now,
                healthy: true,
                scrapers: HashMap::new(),
                total_runs: 0,
                successful_runs: 0,
                failed_runs: 0,
                recent_errors: VecDeque::with_capacity(ERROR_LOG_CAP),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HealthInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record one run outcome. Safe to call concurrently from every task
    /// loop; updates are serialized internally.
    pub fn record(&self, scraper: &str, status: RunStatus, error: Option<&str>) {
        let now = Utc::now();
        let mut inner = self.lock();

        inner.scrapers.insert(
            scraper.to_string(),
            RunRecord {
                scraper: scraper.to_string(),
                status,
                timestamp: now,
                error: error.map(String::from),
            },
        );

        match status {
            RunStatus::Success => inner.successful_runs += 1,
            RunStatus::Failure => {
                inner.failed_runs += 1;
                if let Some(message) = error {
                    if inner.recent_errors.len() == ERROR_LOG_CAP {
                        inner.recent_errors.pop_front();
                    }
                    inner.recent_errors.push_back(ErrorEntry {
                        scraper: scraper.to_string(),
                        error: message.to_string(),
                        timestamp: now,
                    });
                }
            }
        }
        inner.total_runs += 1;
        inner.last_check = now;
    }

    /// Point-in-time read-only view. Derived fields (uptime, success rate)
    /// are computed here, never stored.
    pub fn snapshot(&self) -> HealthSnapshot {
        let now = Utc::now();
        let inner = self.lock();

        let uptime_seconds = (now - inner.started_at).num_seconds().max(0) as u64;
        let success_rate = if inner.total_runs > 0 {
            inner.successful_runs as f64 / inner.total_runs as f64 * 100.0
        } else {
            0.0
        };

        let mut scrapers: Vec<RunRecord> = inner.scrapers.values().cloned().collect();
        scrapers.sort_by(|a, b| a.scraper.cmp(&b.scraper));

        HealthSnapshot {
            healthy: inner.healthy,
            timestamp: now,
            last_check: inner.last_check,
            uptime_seconds,
            uptime_human: format_uptime(uptime_seconds),
            total_runs: inner.total_runs,
            successful_runs: inner.successful_runs,
            failed_runs: inner.failed_runs,
            success_rate,
            scrapers,
            recent_errors: inner.recent_errors.iter().cloned().collect(),
        }
    }
}

impl Default for HealthTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// A read-only view of the tracker at one instant.
#[derive(Debug, Clone)]
pub struct HealthSnapshot {
    pub healthy: bool,
    pub timestamp: DateTime<Utc>,
    pub last_check: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub uptime_human: String,
    pub total_runs: u64,
    pub successful_runs: u64,
    pub failed_runs: u64,
    pub success_rate: f64,
    pub scrapers: Vec<RunRecord>,
    pub recent_errors: Vec<ErrorEntry>,
}

impl HealthSnapshot {
    /// Ready once at least one run has completed, whatever its outcome.
    pub fn ready(&self) -> bool {
        self.total_runs > 0
    }
}

fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }

    if parts.is_empty() {
        "< 1m".to_string()
    } else {
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_invariant() {
        let tracker = HealthTracker::new();
        tracker.record("a", RunStatus::Success, None);
        tracker.record("a", RunStatus::Failure, Some("boom"));
        tracker.record("b", RunStatus::Success, None);

        let snap = tracker.snapshot();
        assert_eq!(snap.total_runs, 3);
        assert_eq!(snap.successful_runs + snap.failed_runs, snap.total_runs);
        assert!((snap.success_rate - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_latest_record_overwritten() {
        let tracker = HealthTracker::new();
        tracker.record("a", RunStatus::Failure, Some("first"));
        tracker.record("a", RunStatus::Success, None);

        let snap = tracker.snapshot();
        assert_eq!(snap.scrapers.len(), 1);
        assert_eq!(snap.scrapers[0].status, RunStatus::Success);
        assert!(snap.scrapers[0].error.is_none());
    }

    #[test]
    fn test_error_ring_evicts_oldest() {
        let tracker = HealthTracker::new();
        for i in 1..=15 {
            let message = format!("e{i}");
            tracker.record("b", RunStatus::Failure, Some(&message));
        }

        let snap = tracker.snapshot();
        assert_eq!(snap.recent_errors.len(), 10);
        assert_eq!(snap.recent_errors[0].error, "e6");
        assert_eq!(snap.recent_errors[9].error, "e15");
        assert_eq!(snap.failed_runs, 15);
    }

    #[test]
    fn test_ready_after_any_outcome() {
        let tracker = HealthTracker::new();
        assert!(!tracker.snapshot().ready());
        tracker.record("b", RunStatus::Failure, Some("still counts"));
        assert!(tracker.snapshot().ready());
    }

    #[test]
    fn test_failure_without_message_skips_ring() {
        let tracker = HealthTracker::new();
        tracker.record("a", RunStatus::Failure, None);
        let snap = tracker.snapshot();
        assert_eq!(snap.failed_runs, 1);
        assert!(snap.recent_errors.is_empty());
    }

    #[test]
    fn test_success_rate_zero_when_idle() {
        let snap = HealthTracker::new().snapshot();
        assert_eq!(snap.success_rate, 0.0);
        assert_eq!(snap.total_runs, 0);
    }

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(0), "< 1m");
        assert_eq!(format_uptime(59), "< 1m");
        assert_eq!(format_uptime(61), "1m");
        assert_eq!(format_uptime(3_600), "1h");
        assert_eq!(format_uptime(90_060), "1d 1h 1m");
    }

    #[tokio::test]
    async fn test_concurrent_records_lose_nothing() {
        let tracker = HealthTracker::new();
        let mut handles = Vec::new();

        for task in 0..8u64 {
            let tracker = tracker.clone();
            handles.push(tokio::spawn(async move {
                let name = format!("scraper-{task}");
                for i in 0..50u64 {
                    // Interleave outcomes and yield points so writers overlap.
                    if (task + i) % 2 == 0 {
                        tracker.record(&name, RunStatus::Success, None);
                    } else {
                        tracker.record(&name, RunStatus::Failure, Some("err"));
                    }
                    if i % 7 == 0 {
                        tokio::task::yield_now().await;
                    }
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let snap = tracker.snapshot();
        assert_eq!(snap.total_runs, 400);
        assert_eq!(snap.successful_runs + snap.failed_runs, 400);
        assert_eq!(snap.successful_runs, 200);
        assert_eq!(snap.scrapers.len(), 8);
        assert_eq!(snap.recent_errors.len(), 10);
    }
}
