//! Rendering of operation outcomes as HTTP responses.
//!
//! JSON replies, errors included, use the `{"message": ...}` envelope.

use axum::body::Body;
use axum::http::header::{self, HeaderValue};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bob_core::MessageEnvelope;
use tokio_util::io::ReaderStream;
use tracing::error;

use crate::health::HealthReport;
use crate::service::{OperationError, OperationResponse};

/// Message returned when every dependency is healthy.
pub const HEALTHY_MESSAGE: &str = "Yes we can! 🔨 🔨";

impl IntoResponse for OperationResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Message(message) => Json(MessageEnvelope::new(message)).into_response(),
            Self::Health(report) => health_response(&report),
            Self::Document { content_type, body } => {
                ([(header::CONTENT_TYPE, content_type)], body).into_response()
            }
            Self::File { file_name, file } => {
                let disposition =
                    HeaderValue::from_str(&format!("attachment; filename=\"{file_name}\""))
                        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
                (
                    [
                        (
                            header::CONTENT_TYPE,
                            HeaderValue::from_static("application/octet-stream"),
                        ),
                        (header::CONTENT_DISPOSITION, disposition),
                    ],
                    Body::from_stream(ReaderStream::new(file)),
                )
                    .into_response()
            }
        }
    }
}

fn health_response(report: &HealthReport) -> Response {
    if report.is_healthy() {
        (StatusCode::OK, Json(MessageEnvelope::text(HEALTHY_MESSAGE))).into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(MessageEnvelope::text(format!(
                "Failed Health Check: {}",
                report.failure_summary()
            ))),
        )
            .into_response()
    }
}

/// HTTP status for a failed operation.
#[must_use]
pub fn status_for(err: &OperationError) -> StatusCode {
    match err {
        OperationError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        OperationError::NotFound(_) => StatusCode::NOT_FOUND,
        OperationError::Downstream(_) => StatusCode::BAD_GATEWAY,
        OperationError::Overloaded => StatusCode::SERVICE_UNAVAILABLE,
        OperationError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        OperationError::UnknownOperation { .. }
        | OperationError::WrongHandler { .. }
        | OperationError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for OperationError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "Internal error serving request");
        }
        (status, Json(MessageEnvelope::text(self.to_string()))).into_response()
    }
}

/// Wraps error responses produced without a body, such as the 408 from the
/// request timeout or axum's 405, in the `{"message": ...}` envelope.
///
/// Headers of the original response (`x-request-id`, `allow`) are kept.
pub async fn envelope_bare_errors(response: Response) -> Response {
    let status = response.status();
    let is_error = status.is_client_error() || status.is_server_error();
    if !is_error || response.headers().contains_key(header::CONTENT_TYPE) {
        return response;
    }

    let message = status.canonical_reason().unwrap_or("Request failed");
    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);

    let mut enveloped = (status, Json(MessageEnvelope::text(message))).into_response();
    enveloped.headers_mut().extend(parts.headers);
    enveloped
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::{json, Value};

    use super::*;
    use crate::health::ProbeResult;
    use crate::query::QueryError;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn probe(dependency: &'static str, error: Option<&str>) -> ProbeResult {
        ProbeResult {
            dependency,
            error: error.map(str::to_string),
            elapsed: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn message_is_wrapped_in_envelope() {
        let response = OperationResponse::Message(json!(["a", "b"])).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"message": ["a", "b"]}));
    }

    #[tokio::test]
    async fn healthy_report_renders_200() {
        let report = HealthReport {
            results: vec![probe("broker", None), probe("query-service", None)],
        };
        let response = OperationResponse::Health(report).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"message": "Yes we can! 🔨 🔨"}));
    }

    #[tokio::test]
    async fn unhealthy_report_renders_503_naming_dependency() {
        let report = HealthReport {
            results: vec![probe("broker", Some("not connected")), probe("query-service", None)],
        };
        let response = OperationResponse::Health(report).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            body_json(response).await,
            json!({"message": "Failed Health Check: broker: not connected"})
        );
    }

    #[tokio::test]
    async fn document_keeps_content_type() {
        let response = OperationResponse::Document {
            content_type: "application/yaml",
            body: bytes::Bytes::from_static(b"openapi: 3.0.0"),
        }
        .into_response();
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/yaml"
        );
    }

    #[test]
    fn error_status_mapping() {
        let cases = [
            (OperationError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (OperationError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                OperationError::Downstream(QueryError::Status {
                    status: 500,
                    body: String::new(),
                }),
                StatusCode::BAD_GATEWAY,
            ),
            (OperationError::Overloaded, StatusCode::SERVICE_UNAVAILABLE),
            (
                OperationError::Timeout { timeout_ms: 10 },
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                OperationError::Internal(anyhow::anyhow!("x")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(status_for(&err), status, "{err}");
        }
    }

    #[tokio::test]
    async fn error_body_uses_envelope() {
        let response = OperationError::NotFound(
            "Cannot locate artifact app.jar in artifact store local".to_string(),
        )
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            json!({"message": "Cannot locate artifact app.jar in artifact store local"})
        );
    }

    #[tokio::test]
    async fn bare_timeout_gets_envelope() {
        let mut bare = Response::new(Body::empty());
        *bare.status_mut() = StatusCode::REQUEST_TIMEOUT;
        bare.headers_mut()
            .insert("x-request-id", HeaderValue::from_static("req-7"));

        let response = envelope_bare_errors(bare).await;
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(response.headers()["x-request-id"], "req-7");
        assert_eq!(body_json(response).await, json!({"message": "Request Timeout"}));
    }

    #[tokio::test]
    async fn typed_responses_are_left_alone() {
        let ok = envelope_bare_errors(Response::new(Body::empty())).await;
        assert_eq!(ok.status(), StatusCode::OK);
        assert!(ok.headers().get(header::CONTENT_TYPE).is_none());

        let not_found = envelope_bare_errors(
            OperationError::NotFound("No such pipeline".to_string()).into_response(),
        )
        .await;
        assert_eq!(
            body_json(not_found).await,
            json!({"message": "No such pipeline"})
        );
    }
}
