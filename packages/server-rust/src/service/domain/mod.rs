//! Domain handlers, one per operation kind.
//!
//! Each handler is a `tower::Service<Operation>` bound in the dispatch table
//! to every operation name of its kind:
//!
//! | Kind | Handler |
//! |---|---|
//! | mutation | [`EntityService`] |
//! | query | [`QueryService`] |
//! | health | [`HealthService`] |
//! | static | [`StaticResourceService`] |

pub mod entities;
pub mod health;
pub mod queries;
pub mod resources;

use bob_core::{OperationKind, OperationName};

use crate::broker::EntityPublisher;
use crate::health::HealthAggregator;
use crate::query::QueryForwarder;
use crate::service::router::{DispatchTable, DispatchTableError};

pub use entities::EntityService;
pub use health::HealthService;
pub use queries::QueryService;
pub use resources::{ResourceConfig, StaticResourceService};

/// The collaborators injected into the domain handlers.
#[derive(Debug, Clone)]
pub struct Collaborators {
    pub publisher: EntityPublisher,
    pub forwarder: QueryForwarder,
    pub health: HealthAggregator,
    pub resources: ResourceConfig,
}

fn names_of(kind: OperationKind) -> impl Iterator<Item = OperationName> {
    OperationName::ALL
        .into_iter()
        .filter(move |name| name.kind() == kind)
}

/// Bind every declared operation to the handler for its kind.
///
/// # Errors
///
/// Only fails if an operation ends up bound twice or not at all.
pub fn build_dispatch_table(
    collaborators: Collaborators,
) -> Result<DispatchTable, DispatchTableError> {
    let Collaborators {
        publisher,
        forwarder,
        health,
        resources,
    } = collaborators;

    DispatchTable::builder()
        .bind_all(names_of(OperationKind::Mutation), &EntityService::new(publisher))?
        .bind_all(names_of(OperationKind::Query), &QueryService::new(forwarder))?
        .bind_all(names_of(OperationKind::Health), &HealthService::new(health))?
        .bind_all(
            names_of(OperationKind::Static),
            &StaticResourceService::new(resources),
        )?
        .build()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::broker::tests::RecordingBroker;
    use crate::health::HealthConfig;

    #[test]
    fn every_operation_is_bound() {
        let collaborators = Collaborators {
            publisher: EntityPublisher::new(Arc::new(RecordingBroker::default()), "bob.entities"),
            forwarder: QueryForwarder::with_client(reqwest::Client::new(), "http://localhost:7779"),
            health: HealthAggregator::new(Vec::new(), &HealthConfig::default()),
            resources: ResourceConfig::default(),
        };

        let table = build_dispatch_table(collaborators).unwrap();
        assert_eq!(table.len(), OperationName::ALL.len());
        for name in OperationName::ALL {
            assert!(table.contains(name));
        }
    }
}
