//! HTTP surface for the health tracker, using Axum.
//!
//! Three read-only projections of the same snapshot: full JSON
//! (`/health`), a readiness flag (`/ready`), and Prometheus-style text
//! (`/metrics`). The server binds before any task loop starts so health
//! is observable from process start.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::routing::get;
use axum::{Json, Router};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use pricewatch_core::{PricewatchError, Result};

use crate::state::HealthTracker;

/// Build the router with all health routes.
pub fn build_router(tracker: HealthTracker) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/metrics", get(metrics))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(tracker)
}

/// Full health report.
async fn health(State(tracker): State<HealthTracker>) -> (StatusCode, Json<serde_json::Value>) {
    let snap = tracker.snapshot();
    let status = if snap.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let scrapers: serde_json::Map<String, serde_json::Value> = snap
        .scrapers
        .iter()
        .map(|record| {
            (
                record.scraper.clone(),
                serde_json::json!({
                    "status": record.status.as_str(),
                    "last_run": record.timestamp.to_rfc3339(),
                    "error": record.error,
                }),
            )
        })
        .collect();

    // Only the five most recent errors go on the report; the ring keeps ten.
    let skip = snap.recent_errors.len().saturating_sub(5);
    let recent_errors: Vec<serde_json::Value> = snap
        .recent_errors
        .iter()
        .skip(skip)
        .map(|entry| {
            serde_json::json!({
                "scraper": entry.scraper,
                "error": entry.error,
                "timestamp": entry.timestamp.to_rfc3339(),
            })
        })
        .collect();

    let status_label = if snap.healthy { "healthy" } else { "unhealthy" };
    let body = serde_json::json!({
        "status": status_label,
        "timestamp": snap.timestamp.to_rfc3339(),
        "uptime_seconds": snap.uptime_seconds,
        "uptime_human": snap.uptime_human,
        "last_check": snap.last_check.to_rfc3339(),
        "statistics": {
            "total_runs": snap.total_runs,
            "successful_runs": snap.successful_runs,
            "failed_runs": snap.failed_runs,
            "success_rate": snap.success_rate,
        },
        "scrapers": scrapers,
        "recent_errors": recent_errors,
    });

    (status, Json(body))
}

/// Readiness probe: ready once any run has completed.
async fn ready(State(tracker): State<HealthTracker>) -> (StatusCode, Json<serde_json::Value>) {
    let snap = tracker.snapshot();
    let is_ready = snap.ready();
    let status = if is_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let message = if is_ready {
        "Service is ready"
    } else {
        "Service is starting up"
    };
    (
        status,
        Json(serde_json::json!({
            "ready": is_ready,
            "message": message,
        })),
    )
}

/// Prometheus exposition of the run counters.
async fn metrics(
    State(tracker): State<HealthTracker>,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    let snap = tracker.snapshot();

    let mut lines = Vec::new();
    lines.push("# HELP price_alert_up Service up status".to_string());
    lines.push("# TYPE price_alert_up gauge".to_string());
    lines.push(format!("price_alert_up {}", if snap.healthy { 1 } else { 0 }));

    lines.push("# HELP price_alert_uptime_seconds Service uptime in seconds".to_string());
    lines.push("# TYPE price_alert_uptime_seconds counter".to_string());
    lines.push(format!("price_alert_uptime_seconds {}", snap.uptime_seconds));

    lines.push("# HELP price_alert_total_runs Total number of scraper runs".to_string());
    lines.push("# TYPE price_alert_total_runs counter".to_string());
    lines.push(format!("price_alert_total_runs {}", snap.total_runs));

    lines.push("# HELP price_alert_successful_runs Total successful scraper runs".to_string());
    lines.push("# TYPE price_alert_successful_runs counter".to_string());
    lines.push(format!("price_alert_successful_runs {}", snap.successful_runs));

    lines.push("# HELP price_alert_failed_runs Total failed scraper runs".to_string());
    lines.push("# TYPE price_alert_failed_runs counter".to_string());
    lines.push(format!("price_alert_failed_runs {}", snap.failed_runs));

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        lines.join("\n"),
    )
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not Found")
}

/// A running health listener.
pub struct HealthServer {
    addr: SocketAddr,
    shutdown: Arc<Notify>,
    handle: JoinHandle<()>,
}

impl HealthServer {
    /// Bind and start serving. A bind failure here is fatal to the whole
    /// process, unlike anything a task loop does.
    pub async fn start(port: u16, tracker: HealthTracker) -> Result<Self> {
        let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
            .await
            .map_err(|e| PricewatchError::Server(format!("bind port {port}: {e}")))?;
        let addr = listener
            .local_addr()
            .map_err(|e| PricewatchError::Server(format!("local addr: {e}")))?;

        let app = build_router(tracker);
        let shutdown = Arc::new(Notify::new());
        let signal = shutdown.clone();

        let handle = tokio::spawn(async move {
            let serve = axum::serve(listener, app)
                .with_graceful_shutdown(async move { signal.notified().await });
            if let Err(e) = serve.await {
                tracing::error!("Health server error: {e}");
            }
        });

        tracing::info!("🌐 Health server listening on http://{addr}");
        tracing::info!("  - /health  full status report");
        tracing::info!("  - /ready   readiness check");
        tracing::info!("  - /metrics Prometheus metrics");

        Ok(Self {
            addr,
            shutdown,
            handle,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections and wait for the listener task to exit.
    pub async fn stop(self) {
        self.shutdown.notify_one();
        let _ = self.handle.await;
        tracing::info!("Health server stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::RunStatus;

    #[tokio::test]
    async fn test_ready_transitions_on_first_record() {
        let tracker = HealthTracker::new();

        let (status, body) = ready(State(tracker.clone())).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.0["ready"], false);

        // Any outcome flips readiness, including a failure.
        tracker.record("power_to_choose", RunStatus::Failure, Some("timeout"));
        let (status, body) = ready(State(tracker)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.0["ready"], true);
    }

    #[tokio::test]
    async fn test_health_report_shape() {
        let tracker = HealthTracker::new();
        tracker.record("power_to_choose", RunStatus::Success, None);
        tracker.record("villa_del_arco", RunStatus::Failure, Some("selector missing"));

        let (status, body) = health(State(tracker)).await;
        assert_eq!(status, StatusCode::OK);
        let body = body.0;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["statistics"]["total_runs"], 2);
        assert_eq!(body["statistics"]["successful_runs"], 1);
        assert_eq!(body["statistics"]["failed_runs"], 1);
        assert_eq!(body["scrapers"]["power_to_choose"]["status"], "success");
        assert_eq!(
            body["scrapers"]["villa_del_arco"]["error"],
            "selector missing"
        );
        assert_eq!(body["recent_errors"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_health_report_caps_recent_errors_at_five() {
        let tracker = HealthTracker::new();
        for i in 1..=8 {
            let message = format!("e{i}");
            tracker.record("b", RunStatus::Failure, Some(&message));
        }

        let (_, body) = health(State(tracker)).await;
        let errors = body.0["recent_errors"].as_array().unwrap().clone();
        assert_eq!(errors.len(), 5);
        assert_eq!(errors[0]["error"], "e4");
        assert_eq!(errors[4]["error"], "e8");
    }

    #[tokio::test]
    async fn test_metrics_exposition() {
        let tracker = HealthTracker::new();
        tracker.record("a", RunStatus::Success, None);
        tracker.record("a", RunStatus::Failure, Some("x"));

        let (status, headers, body) = metrics(State(tracker)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[0].1, "text/plain; version=0.0.4");
        assert!(body.contains("price_alert_up 1"));
        assert!(body.contains("price_alert_total_runs 2"));
        assert!(body.contains("price_alert_successful_runs 1"));
        assert!(body.contains("price_alert_failed_runs 1"));
        assert!(body.contains("# TYPE price_alert_up gauge"));
    }

    #[tokio::test]
    async fn test_server_start_and_stop() {
        let server = HealthServer::start(0, HealthTracker::new()).await.unwrap();
        assert_ne!(server.addr().port(), 0);
        server.stop().await;
    }
}
