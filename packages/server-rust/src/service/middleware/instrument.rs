//! Outermost operation layer: deadline, span, outcome log and metrics.
//!
//! The deadline is applied here rather than further in, so an operation that
//! runs out of time is still logged and counted like any other outcome. Shed
//! load surfaces as an `overloaded` outcome for the same reason.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use tower::{Layer, Service};
use tracing::{info, info_span, warn, Instrument};

use crate::service::operation::{Operation, OperationError, OperationResponse};

/// Wraps the operation service with [`InstrumentService`].
#[derive(Debug, Clone)]
pub struct InstrumentLayer;

impl<S> Layer<S> for InstrumentLayer {
    type Service = InstrumentService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        InstrumentService { inner }
    }
}

/// Runs each operation under `ctx.call_timeout_ms` inside an `operation`
/// span, then records `bob_operations_total{operation,outcome}` and
/// `bob_operation_duration_seconds{operation}`.
#[derive(Debug, Clone)]
pub struct InstrumentService<S> {
    inner: S,
}

impl<S> Service<Operation> for InstrumentService<S>
where
    S: Service<Operation, Response = OperationResponse, Error = OperationError> + Send,
    S::Future: Send + 'static,
{
    type Response = OperationResponse;
    type Error = OperationError;
    type Future = Pin<Box<dyn Future<Output = Result<OperationResponse, OperationError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, op: Operation) -> Self::Future {
        let operation = op.name().as_str();
        let ctx = op.ctx();
        let call_id = ctx.call_id;
        let timeout_ms = ctx.call_timeout_ms;

        let span = info_span!(
            "operation",
            operation,
            call_id,
            request_id = ctx.request_id.as_deref().unwrap_or_default(),
            duration_ms = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );

        let fut = self.inner.call(op);

        Box::pin(
            async move {
                let start = Instant::now();
                let result = tokio::time::timeout(Duration::from_millis(timeout_ms), fut)
                    .await
                    .unwrap_or(Err(OperationError::Timeout { timeout_ms }));
                record_outcome(operation, call_id, start.elapsed(), &result);
                result
            }
            .instrument(span),
        )
    }
}

fn record_outcome(
    operation: &'static str,
    call_id: u64,
    elapsed: Duration,
    result: &Result<OperationResponse, OperationError>,
) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(e) => e.kind(),
    };

    #[allow(clippy::cast_possible_truncation)]
    let duration_ms = elapsed.as_millis() as u64;
    let span = tracing::Span::current();
    span.record("duration_ms", duration_ms);
    span.record("outcome", outcome);

    match result {
        Ok(_) => info!(operation, call_id, duration_ms, outcome, "operation complete"),
        Err(e) => warn!(operation, call_id, duration_ms, outcome, error = %e, "operation failed"),
    }

    metrics::counter!("bob_operations_total", "operation" => operation, "outcome" => outcome)
        .increment(1);
    metrics::histogram!("bob_operation_duration_seconds", "operation" => operation)
        .record(elapsed.as_secs_f64());
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
