//! Operation dispatch: routes each `Operation` to the handler bound to its name.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bob_core::OperationName;
use tower::util::BoxCloneSyncService;
use tower::{Service, ServiceExt};

use super::operation::{Operation, OperationError, OperationResponse};

/// A type-erased handler for one or more operation names.
pub type BoxedHandler = BoxCloneSyncService<Operation, OperationResponse, OperationError>;

type BoxedFuture = Pin<Box<dyn Future<Output = Result<OperationResponse, OperationError>> + Send>>;

// ---------------------------------------------------------------------------
// DispatchTableError
// ---------------------------------------------------------------------------

/// Failure assembling a [`DispatchTable`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchTableError {
    #[error("operation {0} is already bound to a handler")]
    DuplicateBinding(OperationName),
    #[error("operations without a handler: {}", join_names(.0))]
    Unbound(Vec<OperationName>),
}

fn join_names(names: &[OperationName]) -> String {
    names
        .iter()
        .map(|n| n.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

// ---------------------------------------------------------------------------
// DispatchTable
// ---------------------------------------------------------------------------

/// Immutable mapping from every declared [`OperationName`] to its handler.
///
/// Built once at startup; cloning shares the table. Each call clones the
/// bound handler and drives it to completion, so concurrent requests never
/// contend on a handler's readiness.
#[derive(Clone)]
pub struct DispatchTable {
    handlers: Arc<HashMap<OperationName, BoxedHandler>>,
}

impl DispatchTable {
    #[must_use]
    pub fn builder() -> DispatchTableBuilder {
        DispatchTableBuilder::default()
    }

    /// Whether a handler is bound for `name`.
    #[must_use]
    pub fn contains(&self, name: OperationName) -> bool {
        self.handlers.contains_key(&name)
    }

    /// Number of bound operation names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.handlers.keys().copied().collect();
        names.sort();
        f.debug_struct("DispatchTable").field("operations", &names).finish()
    }
}

impl Service<Operation> for DispatchTable {
    type Response = OperationResponse;
    type Error = OperationError;
    type Future = BoxedFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Handlers are cloned per call and readied inside `oneshot`.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, op: Operation) -> Self::Future {
        let name = op.name();
        match self.handlers.get(&name) {
            Some(handler) => Box::pin(handler.clone().oneshot(op)),
            None => Box::pin(async move { Err(OperationError::UnknownOperation { name }) }),
        }
    }
}

// ---------------------------------------------------------------------------
// DispatchTableBuilder
// ---------------------------------------------------------------------------

/// Collects handler bindings; [`build`](Self::build) checks completeness.
#[derive(Default)]
pub struct DispatchTableBuilder {
    handlers: HashMap<OperationName, BoxedHandler>,
}

impl DispatchTableBuilder {
    /// Bind `service` to `name`.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateBinding` if `name` already has a handler.
    pub fn bind<S>(mut self, name: OperationName, service: S) -> Result<Self, DispatchTableError>
    where
        S: Service<Operation, Response = OperationResponse, Error = OperationError>
            + Clone
            + Send
            + Sync
            + 'static,
        S::Future: Send + 'static,
    {
        if self.handlers.contains_key(&name) {
            return Err(DispatchTableError::DuplicateBinding(name));
        }
        self.handlers.insert(name, BoxCloneSyncService::new(service));
        Ok(self)
    }

    /// Bind a clone of `service` to each of `names`.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateBinding` on the first name that already has a handler.
    pub fn bind_all<S>(
        self,
        names: impl IntoIterator<Item = OperationName>,
        service: &S,
    ) -> Result<Self, DispatchTableError>
    where
        S: Service<Operation, Response = OperationResponse, Error = OperationError>
            + Clone
            + Send
            + Sync
            + 'static,
        S::Future: Send + 'static,
    {
        names
            .into_iter()
            .try_fold(self, |builder, name| builder.bind(name, service.clone()))
    }

    /// Finish the table.
    ///
    /// # Errors
    ///
    /// Returns `Unbound` listing every declared operation without a handler.
    pub fn build(self) -> Result<DispatchTable, DispatchTableError> {
        let unbound: Vec<_> = OperationName::ALL
            .into_iter()
            .filter(|name| !self.handlers.contains_key(name))
            .collect();
        if !unbound.is_empty() {
            return Err(DispatchTableError::Unbound(unbound));
        }
        Ok(DispatchTable {
            handlers: Arc::new(self.handlers),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::service::operation::OperationContext;

    /// Answers with the name of the operation it received, tagged with `label`.
    #[derive(Clone)]
    struct EchoService {
        label: &'static str,
    }

    impl Service<Operation> for EchoService {
        type Response = OperationResponse;
        type Error = OperationError;
        type Future = BoxedFuture;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, op: Operation) -> Self::Future {
            let reply = json!({ "handler": self.label, "operation": op.name().as_str() });
            Box::pin(async move { Ok(OperationResponse::Message(reply)) })
        }
    }

    fn full_table() -> DispatchTable {
        DispatchTable::builder()
            .bind(OperationName::HealthCheck, EchoService { label: "health" })
            .unwrap()
            .bind_all(
                OperationName::ALL
                    .into_iter()
                    .filter(|n| *n != OperationName::HealthCheck),
                &EchoService { label: "rest" },
            )
            .unwrap()
            .build()
            .unwrap()
    }

    fn message(resp: OperationResponse) -> Value {
        match resp {
            OperationResponse::Message(v) => v,
            other => panic!("expected message, got {other:?}"),
        }
    }

    #[test]
    fn every_operation_is_bound_exactly_once() {
        let table = full_table();
        assert_eq!(table.len(), OperationName::ALL.len());
        for name in OperationName::ALL {
            assert!(table.contains(name), "{name} unbound");
        }
    }

    #[tokio::test]
    async fn routes_to_handler_bound_for_name() {
        let table = full_table();

        let resp = table
            .clone()
            .oneshot(Operation::HealthCheck {
                ctx: OperationContext::new(1, 5000),
            })
            .await
            .unwrap();
        assert_eq!(message(resp), json!({"handler": "health", "operation": "HealthCheck"}));

        let resp = table
            .oneshot(Operation::ArtifactStoreList {
                ctx: OperationContext::new(2, 5000),
            })
            .await
            .unwrap();
        assert_eq!(
            message(resp),
            json!({"handler": "rest", "operation": "ArtifactStoreList"})
        );
    }

    #[test]
    fn duplicate_binding_is_rejected() {
        let result = DispatchTable::builder()
            .bind(OperationName::PipelineCreate, EchoService { label: "a" })
            .unwrap()
            .bind(OperationName::PipelineCreate, EchoService { label: "b" });
        assert_eq!(
            result.err(),
            Some(DispatchTableError::DuplicateBinding(OperationName::PipelineCreate))
        );
    }

    #[test]
    fn build_fails_when_operations_are_unbound() {
        let err = DispatchTable::builder()
            .bind_all(
                OperationName::ALL
                    .into_iter()
                    .filter(|n| !matches!(n, OperationName::PipelineLogs | OperationName::GetApiSpec)),
                &EchoService { label: "rest" },
            )
            .unwrap()
            .build()
            .unwrap_err();

        assert_eq!(
            err,
            DispatchTableError::Unbound(vec![OperationName::GetApiSpec, OperationName::PipelineLogs])
        );
        assert_eq!(
            err.to_string(),
            "operations without a handler: GetApiSpec, PipelineLogs"
        );
    }
}
