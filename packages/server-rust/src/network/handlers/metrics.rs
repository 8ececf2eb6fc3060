//! Prometheus scrape endpoint.
//!
//! Besides the gateway's own operation and publish metrics, every scrape
//! refreshes the job-count gauges from the query service, which owns the
//! run history.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bob_core::MessageEnvelope;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::Value;
use tracing::warn;

use super::AppState;
use crate::query::{DownstreamQuery, QueryForwarder};

/// Downstream path answering `{"running": n, "passed": n, ...}`.
pub const JOB_COUNTS_PATH: &str = "/metrics/jobs";

/// Run status and the gauge mirroring its count.
const JOB_GAUGES: [(&str, &str); 5] = [
    ("running", "bob_running_jobs"),
    ("passed", "bob_passed_jobs"),
    ("failed", "bob_failed_jobs"),
    ("paused", "bob_paused_jobs"),
    ("stopped", "bob_stopped_jobs"),
];

/// What `GET /metrics` renders from.
#[derive(Clone)]
pub struct MetricsEndpoint {
    handle: PrometheusHandle,
    jobs: QueryForwarder,
}

impl MetricsEndpoint {
    #[must_use]
    pub fn new(handle: PrometheusHandle, jobs: QueryForwarder) -> Self {
        Self { handle, jobs }
    }
}

/// `GET /metrics`: the Prometheus text exposition, or 404 when metrics are disabled.
///
/// A failed job-count refresh is logged and the last known gauges are served.
pub async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.metrics {
        Some(endpoint) => {
            refresh_job_gauges(&endpoint.jobs).await;
            (
                [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
                endpoint.handle.render(),
            )
                .into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(MessageEnvelope::text("Metrics are disabled")),
        )
            .into_response(),
    }
}

async fn refresh_job_gauges(jobs: &QueryForwarder) {
    match jobs.forward(&DownstreamQuery::new(JOB_COUNTS_PATH)).await {
        Ok(counts) => record_job_counts(&counts),
        Err(e) => warn!(error = %e, "Could not refresh job gauges"),
    }
}

/// Sets each job gauge present as a number in `counts`; others keep their value.
pub(crate) fn record_job_counts(counts: &Value) {
    for (status, gauge) in JOB_GAUGES {
        if let Some(count) = counts.get(status).and_then(Value::as_f64) {
            metrics::gauge!(gauge).set(count);
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::telemetry::tests::run_recorded;

    #[test]
    fn job_counts_set_gauges() {
        let ((), recorded) = run_recorded(async {
            record_job_counts(&json!({
                "running": 2,
                "passed": 40,
                "failed": 3,
                "paused": 0,
                "stopped": 1,
                "queued": 9,
            }));
        });

        assert_eq!(recorded.gauge("bob_running_jobs"), Some(2.0));
        assert_eq!(recorded.gauge("bob_passed_jobs"), Some(40.0));
        assert_eq!(recorded.gauge("bob_failed_jobs"), Some(3.0));
        assert_eq!(recorded.gauge("bob_paused_jobs"), Some(0.0));
        assert_eq!(recorded.gauge("bob_stopped_jobs"), Some(1.0));
        assert_eq!(recorded.gauge("bob_queued_jobs"), None);
    }

    #[test]
    fn non_numeric_counts_are_skipped() {
        let ((), recorded) = run_recorded(async {
            record_job_counts(&json!({"running": "many", "failed": 1}));
        });

        assert_eq!(recorded.gauge("bob_running_jobs"), None);
        assert_eq!(recorded.gauge("bob_failed_jobs"), Some(1.0));
    }
}
