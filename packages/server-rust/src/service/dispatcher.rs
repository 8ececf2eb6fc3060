//! Entry point from the transport layer into the operation pipeline.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tower::ServiceExt;

use super::config::ServerConfig;
use super::middleware::{build_operation_pipeline, OperationPipeline};
use super::operation::{Operation, OperationContext, OperationError, OperationResponse};
use super::router::DispatchTable;

/// Assigns call ids and sends operations through the middleware pipeline.
///
/// Cheap to clone; clones share the call-id counter and the concurrency limit.
#[derive(Clone)]
pub struct Dispatcher {
    pipeline: OperationPipeline,
    call_ids: Arc<AtomicU64>,
    call_timeout_ms: u64,
}

impl Dispatcher {
    #[must_use]
    pub fn new(table: DispatchTable, config: &ServerConfig) -> Self {
        Self {
            pipeline: build_operation_pipeline(table, config),
            call_ids: Arc::new(AtomicU64::new(0)),
            call_timeout_ms: config.default_operation_timeout_ms,
        }
    }

    /// A fresh context for the next operation.
    #[must_use]
    pub fn context(&self, request_id: Option<String>) -> OperationContext {
        let call_id = self.call_ids.fetch_add(1, Ordering::Relaxed) + 1;
        OperationContext::new(call_id, self.call_timeout_ms).with_request_id(request_id)
    }

    /// Run `op` to completion.
    ///
    /// # Errors
    ///
    /// Whatever the pipeline or the bound handler reports.
    pub async fn dispatch(&self, op: Operation) -> Result<OperationResponse, OperationError> {
        self.pipeline.clone().oneshot(op).await
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("call_timeout_ms", &self.call_timeout_ms)
            .finish_non_exhaustive()
    }
}
