//! Read handler: forwards queries to the downstream query service.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tower::Service;

use crate::query::{DownstreamQuery, QueryForwarder};
use crate::service::operation::{Operation, OperationError, OperationResponse};

/// The CCTray feed is rendered downstream and relayed as-is.
pub const CCTRAY_CONTENT_TYPE: &str = "application/xml";

/// Handler for every read: pipeline logs, status and listings, the entity
/// listings, and the CCTray feed.
#[derive(Debug, Clone)]
pub struct QueryService {
    forwarder: QueryForwarder,
}

impl QueryService {
    #[must_use]
    pub fn new(forwarder: QueryForwarder) -> Self {
        Self { forwarder }
    }
}

impl Service<Operation> for QueryService {
    type Response = OperationResponse;
    type Error = OperationError;
    type Future = Pin<Box<dyn Future<Output = Result<OperationResponse, OperationError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, op: Operation) -> Self::Future {
        let forwarder = self.forwarder.clone();
        Box::pin(async move {
            let query = downstream_query(&op).ok_or(OperationError::WrongHandler { name: op.name() })?;
            if matches!(op, Operation::CCTray { .. }) {
                let body = forwarder.fetch(&query).await?;
                return Ok(OperationResponse::Document {
                    content_type: CCTRAY_CONTENT_TYPE,
                    body,
                });
            }
            let reply = forwarder.forward(&query).await?;
            Ok(OperationResponse::Message(reply))
        })
    }
}

/// The downstream request serving `op`, if `op` is a read.
#[must_use]
pub fn downstream_query(op: &Operation) -> Option<DownstreamQuery> {
    let query = match op {
        Operation::PipelineLogs {
            run,
            offset,
            lines,
            ..
        } => DownstreamQuery::new("/pipelines/logs")
            .param("group", &run.group)
            .param("name", &run.name)
            .param("number", run.number)
            .param("offset", offset)
            .param("lines", lines),
        Operation::PipelineStatus { run, .. } => DownstreamQuery::new("/pipelines/status")
            .param("group", &run.group)
            .param("name", &run.name)
            .param("number", run.number),
        Operation::PipelineList { filter, .. } => DownstreamQuery::new("/pipelines")
            .param_opt("group", filter.group.as_ref())
            .param_opt("name", filter.name.as_ref())
            .param_opt("status", filter.status.as_ref()),
        Operation::ResourceProviderList { .. } => DownstreamQuery::new("/resource-providers"),
        Operation::ArtifactStoreList { .. } => DownstreamQuery::new("/artifact-stores"),
        Operation::CCTray { .. } => DownstreamQuery::new("/cctray.xml"),
        _ => return None,
    };
    Some(query)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
