//! `HealthCheck` handler.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tower::Service;

use crate::health::HealthAggregator;
use crate::service::operation::{Operation, OperationError, OperationResponse};

/// Runs the dependency probes and returns their report.
#[derive(Debug, Clone)]
pub struct HealthService {
    aggregator: HealthAggregator,
}

impl HealthService {
    #[must_use]
    pub fn new(aggregator: HealthAggregator) -> Self {
        Self { aggregator }
    }
}

impl Service<Operation> for HealthService {
    type Response = OperationResponse;
    type Error = OperationError;
    type Future = Pin<Box<dyn Future<Output = Result<OperationResponse, OperationError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, op: Operation) -> Self::Future {
        let aggregator = self.aggregator.clone();
        Box::pin(async move {
            match op {
                Operation::HealthCheck { .. } => {
                    Ok(OperationResponse::Health(aggregator.check().await))
                }
                other => Err(OperationError::WrongHandler { name: other.name() }),
            }
        })
    }
}
