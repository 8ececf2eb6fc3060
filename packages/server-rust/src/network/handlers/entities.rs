//! Resource provider and artifact store endpoints.

use axum::extract::State;

use super::extract::{ApiBody, ApiPath};
use super::{entity_body, AppState, OpContext, OperationResult};
use crate::service::Operation;

/// `POST /resource-providers/{name}`
pub async fn resource_provider_create_handler(
    State(state): State<AppState>,
    OpContext(ctx): OpContext,
    ApiPath(name): ApiPath<String>,
    ApiBody(body): ApiBody,
) -> OperationResult {
    let body = entity_body(&body)?;
    state
        .dispatcher
        .dispatch(Operation::ResourceProviderCreate { ctx, name, body })
        .await
}

/// `DELETE /resource-providers/{name}`
pub async fn resource_provider_delete_handler(
    State(state): State<AppState>,
    OpContext(ctx): OpContext,
    ApiPath(name): ApiPath<String>,
) -> OperationResult {
    state
        .dispatcher
        .dispatch(Operation::ResourceProviderDelete { ctx, name })
        .await
}

/// `GET /resource-providers`
pub async fn resource_provider_list_handler(
    State(state): State<AppState>,
    OpContext(ctx): OpContext,
) -> OperationResult {
    state
        .dispatcher
        .dispatch(Operation::ResourceProviderList { ctx })
        .await
}

/// `POST /artifact-stores/{name}`
pub async fn artifact_store_create_handler(
    State(state): State<AppState>,
    OpContext(ctx): OpContext,
    ApiPath(name): ApiPath<String>,
    ApiBody(body): ApiBody,
) -> OperationResult {
    let body = entity_body(&body)?;
    state
        .dispatcher
        .dispatch(Operation::ArtifactStoreCreate { ctx, name, body })
        .await
}

/// `DELETE /artifact-stores/{name}`
pub async fn artifact_store_delete_handler(
    State(state): State<AppState>,
    OpContext(ctx): OpContext,
    ApiPath(name): ApiPath<String>,
) -> OperationResult {
    state
        .dispatcher
        .dispatch(Operation::ArtifactStoreDelete { ctx, name })
        .await
}

/// `GET /artifact-stores`
pub async fn artifact_store_list_handler(
    State(state): State<AppState>,
    OpContext(ctx): OpContext,
) -> OperationResult {
    state
        .dispatcher
        .dispatch(Operation::ArtifactStoreList { ctx })
        .await
}
