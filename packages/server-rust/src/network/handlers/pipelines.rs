//! Pipeline endpoints.

use axum::extract::State;
use serde::Deserialize;

use super::extract::{ApiBody, ApiPath, ApiQuery};
use super::{entity_body, AppState, OpContext, OperationResult};
use crate::service::{ArtifactRef, Operation, PipelineFilter, PipelineRef, PipelineRun};

/// Path parameters of the logs endpoint.
#[derive(Debug, Deserialize)]
pub struct LogsPath {
    group: String,
    name: String,
    number: u64,
    offset: u64,
    lines: u64,
}

/// `POST /pipelines/groups/{group}/names/{name}`
pub async fn pipeline_create_handler(
    State(state): State<AppState>,
    OpContext(ctx): OpContext,
    ApiPath(pipeline): ApiPath<PipelineRef>,
    ApiBody(body): ApiBody,
) -> OperationResult {
    let body = entity_body(&body)?;
    state
        .dispatcher
        .dispatch(Operation::PipelineCreate {
            ctx,
            pipeline,
            body,
        })
        .await
}

/// `DELETE /pipelines/groups/{group}/names/{name}`
pub async fn pipeline_delete_handler(
    State(state): State<AppState>,
    OpContext(ctx): OpContext,
    ApiPath(pipeline): ApiPath<PipelineRef>,
) -> OperationResult {
    state
        .dispatcher
        .dispatch(Operation::PipelineDelete { ctx, pipeline })
        .await
}

/// `POST /pipelines/start/groups/{group}/names/{name}`
pub async fn pipeline_start_handler(
    State(state): State<AppState>,
    OpContext(ctx): OpContext,
    ApiPath(pipeline): ApiPath<PipelineRef>,
) -> OperationResult {
    state
        .dispatcher
        .dispatch(Operation::PipelineStart { ctx, pipeline })
        .await
}

/// `POST /pipelines/stop/groups/{group}/names/{name}/number/{number}`
pub async fn pipeline_stop_handler(
    State(state): State<AppState>,
    OpContext(ctx): OpContext,
    ApiPath(run): ApiPath<PipelineRun>,
) -> OperationResult {
    state
        .dispatcher
        .dispatch(Operation::PipelineStop { ctx, run })
        .await
}

/// `GET /pipelines/logs/groups/{group}/names/{name}/number/{number}/offset/{offset}/lines/{lines}`
pub async fn pipeline_logs_handler(
    State(state): State<AppState>,
    OpContext(ctx): OpContext,
    ApiPath(path): ApiPath<LogsPath>,
) -> OperationResult {
    let LogsPath {
        group,
        name,
        number,
        offset,
        lines,
    } = path;
    state
        .dispatcher
        .dispatch(Operation::PipelineLogs {
            ctx,
            run: PipelineRun {
                group,
                name,
                number,
            },
            offset,
            lines,
        })
        .await
}

/// `GET /pipelines/status/groups/{group}/names/{name}/number/{number}`
pub async fn pipeline_status_handler(
    State(state): State<AppState>,
    OpContext(ctx): OpContext,
    ApiPath(run): ApiPath<PipelineRun>,
) -> OperationResult {
    state
        .dispatcher
        .dispatch(Operation::PipelineStatus { ctx, run })
        .await
}

/// `GET /pipelines?group=&name=&status=`
pub async fn pipeline_list_handler(
    State(state): State<AppState>,
    OpContext(ctx): OpContext,
    ApiQuery(filter): ApiQuery<PipelineFilter>,
) -> OperationResult {
    state
        .dispatcher
        .dispatch(Operation::PipelineList { ctx, filter })
        .await
}

/// `GET /pipelines/groups/{group}/names/{name}/number/{number}/artifact-stores/{store}/artifact/{artifact}`
pub async fn pipeline_artifact_handler(
    State(state): State<AppState>,
    OpContext(ctx): OpContext,
    ApiPath(artifact): ApiPath<ArtifactRef>,
) -> OperationResult {
    state
        .dispatcher
        .dispatch(Operation::PipelineArtifactFetch { ctx, artifact })
        .await
}

/// `GET /cctray.xml`: latest run of every pipeline in CCTray format.
pub async fn cctray_handler(
    State(state): State<AppState>,
    OpContext(ctx): OpContext,
) -> OperationResult {
    state.dispatcher.dispatch(Operation::CCTray { ctx }).await
}
