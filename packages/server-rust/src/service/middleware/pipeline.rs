//! Pipeline composition: combines all middleware layers into a single service stack.

use tower::load_shed::error::Overloaded;
use tower::util::BoxCloneSyncService;
use tower::{BoxError, ServiceBuilder};

use super::instrument::InstrumentLayer;
use crate::service::config::ServerConfig;
use crate::service::operation::{Operation, OperationError, OperationResponse};
use crate::service::router::DispatchTable;

/// The fully layered operation service, cheap to clone per request.
pub type OperationPipeline = BoxCloneSyncService<Operation, OperationResponse, OperationError>;

/// Build the operation pipeline by wrapping the `DispatchTable` with middleware layers.
///
/// Layer order (outermost to innermost):
/// 1. `InstrumentLayer` -- deadline, span, outcome log and metrics
/// 2. `LoadShed` -- fail fast with `Overloaded` instead of queueing
/// 3. `ConcurrencyLimit` -- at most `max_concurrent_operations` in flight
///
/// Clones of the returned service share one concurrency limit.
#[must_use]
pub fn build_operation_pipeline(table: DispatchTable, config: &ServerConfig) -> OperationPipeline {
    let limit = usize::try_from(config.max_concurrent_operations).unwrap_or(usize::MAX);

    BoxCloneSyncService::new(
        ServiceBuilder::new()
            .layer(InstrumentLayer)
            .map_err(into_operation_error)
            .load_shed()
            .concurrency_limit(limit)
            .service(table),
    )
}

/// Recovers the typed error from tower's boxed one.
fn into_operation_error(err: BoxError) -> OperationError {
    if err.is::<Overloaded>() {
        return OperationError::Overloaded;
    }
    match err.downcast::<OperationError>() {
        Ok(err) => *err,
        Err(other) => OperationError::Internal(anyhow::anyhow!("{other}")),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
