//! HTTP handler definitions for the API server.
//!
//! Every operation handler follows the same shape: extract parameters,
//! build the typed [`Operation`](crate::service::Operation), and hand it to
//! the [`Dispatcher`]. Rendering of the outcome lives in [`response`].

pub mod entities;
pub mod extract;
pub mod metrics;
pub mod pipelines;
pub mod response;
pub mod system;

pub use entities::{
    artifact_store_create_handler, artifact_store_delete_handler, artifact_store_list_handler,
    resource_provider_create_handler, resource_provider_delete_handler,
    resource_provider_list_handler,
};
pub use extract::{ApiBody, ApiPath, ApiQuery, ApiRejection};
pub use metrics::{metrics_handler, MetricsEndpoint};
pub use pipelines::{
    cctray_handler, pipeline_artifact_handler, pipeline_create_handler, pipeline_delete_handler,
    pipeline_list_handler, pipeline_logs_handler, pipeline_start_handler, pipeline_status_handler,
    pipeline_stop_handler,
};
pub use system::{api_spec_handler, health_handler, not_found_handler};

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde_json::Value;

use super::config::NetworkConfig;
use super::middleware::REQUEST_ID_HEADER;
use crate::service::{Dispatcher, EntityBody, OperationContext, OperationError, OperationResponse};

/// Return type of every operation handler.
pub type OperationResult = Result<OperationResponse, OperationError>;

/// Shared application state passed to all axum handlers via `State` extraction.
///
/// Holds `Arc`-backed handles so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Entry point into the operation pipeline.
    pub dispatcher: Dispatcher,
    /// Network configuration (bind address, limits).
    pub config: Arc<NetworkConfig>,
    /// Scrape endpoint state; `None` when metrics are disabled.
    pub metrics: Option<MetricsEndpoint>,
}

/// Extracts a fresh [`OperationContext`] carrying the request's `x-request-id`.
#[derive(Debug)]
pub struct OpContext(pub OperationContext);

impl FromRequestParts<AppState> for OpContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let request_id = parts
            .headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        Ok(Self(state.dispatcher.context(request_id)))
    }
}

/// Parses an optional create body.
///
/// An empty body (or JSON `null`) means no body; anything other than a JSON
/// object is rejected.
pub(crate) fn entity_body(raw: &[u8]) -> Result<EntityBody, OperationError> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    match serde_json::from_slice(raw) {
        Ok(Value::Object(map)) => Ok(Some(map)),
        Ok(Value::Null) => Ok(None),
        Ok(_) => Err(OperationError::InvalidInput(
            "Request body must be a JSON object".to_string(),
        )),
        Err(e) => Err(OperationError::InvalidInput(format!(
            "Request body is not valid JSON: {e}"
        ))),
    }
}
