//! Health check, API document, and fallback endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use bob_core::MessageEnvelope;

use super::{AppState, OpContext, OperationResult};
use crate::service::Operation;

/// `GET /can-we-build-it`
///
/// 200 when every dependency is reachable, 503 naming the failed ones otherwise.
pub async fn health_handler(
    State(state): State<AppState>,
    OpContext(ctx): OpContext,
) -> OperationResult {
    state.dispatcher.dispatch(Operation::HealthCheck { ctx }).await
}

/// `GET /api.yaml`
pub async fn api_spec_handler(
    State(state): State<AppState>,
    OpContext(ctx): OpContext,
) -> OperationResult {
    state.dispatcher.dispatch(Operation::GetApiSpec { ctx }).await
}

/// Any unmatched route.
pub async fn not_found_handler() -> (StatusCode, Json<MessageEnvelope>) {
    (StatusCode::NOT_FOUND, Json(MessageEnvelope::text("Not found")))
}
