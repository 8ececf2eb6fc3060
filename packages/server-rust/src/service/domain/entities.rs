//! Entity lifecycle handler.
//!
//! Builds the entity event for a mutating operation, hands it to the
//! publisher and answers right away with a confirmation message. The publish
//! outcome never reaches the caller.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use bob_core::{EntityEvent, EntityParams};
use serde_json::Value;
use tower::Service;
use tracing::debug;

use crate::broker::EntityPublisher;
use crate::service::operation::{
    EntityBody, Operation, OperationError, OperationResponse, PipelineRef, PipelineRun,
};

/// Handler for every `*Create`, `*Delete`, `*Start` and `*Stop` operation.
#[derive(Debug, Clone)]
pub struct EntityService {
    publisher: EntityPublisher,
}

impl EntityService {
    #[must_use]
    pub fn new(publisher: EntityPublisher) -> Self {
        Self { publisher }
    }
}

impl Service<Operation> for EntityService {
    type Response = OperationResponse;
    type Error = OperationError;
    type Future = Pin<Box<dyn Future<Output = Result<OperationResponse, OperationError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, op: Operation) -> Self::Future {
        let publisher = self.publisher.clone();
        Box::pin(async move {
            let call_id = op.ctx().call_id;
            let (event, confirmation) = entity_event(op)?;
            debug!(
                call_id,
                event_type = event.event_type.as_str(),
                subject = publisher.subject(),
                "Submitting entity event"
            );
            // Detached: the handle is dropped and the response does not wait.
            drop(publisher.publish(event));
            Ok(OperationResponse::Message(Value::String(confirmation)))
        })
    }
}

/// The event to publish for `op` and the confirmation shown to the caller.
fn entity_event(op: Operation) -> Result<(EntityEvent, String), OperationError> {
    let name = op.name();
    let Some(event_type) = name.event_type() else {
        return Err(OperationError::WrongHandler { name });
    };

    let (params, body, confirmation): (EntityParams, EntityBody, String) = match op {
        Operation::PipelineCreate {
            pipeline: PipelineRef { group, name },
            body,
            ..
        } => {
            let confirmation = format!("Successfully Created Pipeline {group} {name}");
            (EntityParams::pipeline(group, name), body, confirmation)
        }
        Operation::PipelineDelete {
            pipeline: PipelineRef { group, name },
            ..
        } => {
            let confirmation = format!("Successfully Deleted Pipeline {group} {name}");
            (EntityParams::pipeline(group, name), None, confirmation)
        }
        Operation::PipelineStart {
            pipeline: PipelineRef { group, name },
            ..
        } => {
            let confirmation = format!("Successfully Started Pipeline {group} {name}");
            (EntityParams::pipeline(group, name), None, confirmation)
        }
        Operation::PipelineStop {
            run: PipelineRun {
                group,
                name,
                number,
            },
            ..
        } => {
            let confirmation = format!("Successfully Stopped Pipeline {group} {name} {number}");
            (EntityParams::pipeline_run(group, name, number), None, confirmation)
        }
        Operation::ResourceProviderCreate { name, body, .. } => {
            let confirmation = format!("Created Resource Provider {name}");
            (EntityParams::named(name), body, confirmation)
        }
        Operation::ResourceProviderDelete { name, .. } => {
            let confirmation = format!("Deleted Resource Provider {name}");
            (EntityParams::named(name), None, confirmation)
        }
        Operation::ArtifactStoreCreate { name, body, .. } => {
            let confirmation = format!("Created Artifact Store {name}");
            (EntityParams::named(name), body, confirmation)
        }
        Operation::ArtifactStoreDelete { name, .. } => {
            let confirmation = format!("Deleted Artifact Store {name}");
            (EntityParams::named(name), None, confirmation)
        }
        _ => return Err(OperationError::WrongHandler { name }),
    };

    Ok((EntityEvent::build(event_type, params, body), confirmation))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::broker::tests::RecordingBroker;
    use crate::service::operation::OperationContext;
    use crate::telemetry::tests::run_recorded;

    fn ctx() -> OperationContext {
        OperationContext::new(1, 5000)
    }

    fn pipeline() -> PipelineRef {
        PipelineRef {
            group: "infra".to_string(),
            name: "build".to_string(),
        }
    }

    fn message(resp: OperationResponse) -> Value {
        match resp {
            OperationResponse::Message(v) => v,
            other => panic!("expected message, got {other:?}"),
        }
    }

    /// Let the detached publish task run.
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    fn service(broker: &Arc<RecordingBroker>) -> EntityService {
        EntityService::new(EntityPublisher::new(broker.clone(), "bob.entities"))
    }

    #[tokio::test]
    async fn pipeline_create_merges_body_and_confirms() {
        let broker = Arc::new(RecordingBroker::default());
        let body = json!({"steps": [{"cmd": "echo hello"}], "name": "ignored"});

        let resp = service(&broker)
            .oneshot(Operation::PipelineCreate {
                ctx: ctx(),
                pipeline: pipeline(),
                body: body.as_object().cloned(),
            })
            .await
            .unwrap();
        assert_eq!(message(resp), json!("Successfully Created Pipeline infra build"));

        settle().await;
        let published = broker.messages();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].message_type, "pipeline/create");
        assert_eq!(
            published[0].body,
            json!({"steps": [{"cmd": "echo hello"}], "name": "build", "group": "infra"})
        );
    }

    #[tokio::test]
    async fn pipeline_stop_carries_run_number() {
        let broker = Arc::new(RecordingBroker::default());

        let resp = service(&broker)
            .oneshot(Operation::PipelineStop {
                ctx: ctx(),
                run: PipelineRun {
                    group: "infra".to_string(),
                    name: "build".to_string(),
                    number: 3,
                },
            })
            .await
            .unwrap();
        assert_eq!(message(resp), json!("Successfully Stopped Pipeline infra build 3"));

        settle().await;
        let published = broker.messages();
        assert_eq!(published[0].message_type, "pipeline/stop");
        assert_eq!(
            published[0].body,
            json!({"name": "build", "group": "infra", "number": 3})
        );
    }

    #[tokio::test]
    async fn confirmation_messages_per_operation() {
        let broker = Arc::new(RecordingBroker::default());
        let cases = [
            (
                Operation::PipelineDelete {
                    ctx: ctx(),
                    pipeline: pipeline(),
                },
                "Successfully Deleted Pipeline infra build",
                "pipeline/delete",
            ),
            (
                Operation::PipelineStart {
                    ctx: ctx(),
                    pipeline: pipeline(),
                },
                "Successfully Started Pipeline infra build",
                "pipeline/start",
            ),
            (
                Operation::ResourceProviderCreate {
                    ctx: ctx(),
                    name: "local".to_string(),
                    body: None,
                },
                "Created Resource Provider local",
                "resource-provider/create",
            ),
            (
                Operation::ResourceProviderDelete {
                    ctx: ctx(),
                    name: "local".to_string(),
                },
                "Deleted Resource Provider local",
                "resource-provider/delete",
            ),
            (
                Operation::ArtifactStoreCreate {
                    ctx: ctx(),
                    name: "s3".to_string(),
                    body: None,
                },
                "Created Artifact Store s3",
                "artifact-store/create",
            ),
            (
                Operation::ArtifactStoreDelete {
                    ctx: ctx(),
                    name: "s3".to_string(),
                },
                "Deleted Artifact Store s3",
                "artifact-store/delete",
            ),
        ];

        for (op, expected_message, expected_type) in cases {
            let resp = service(&broker).oneshot(op).await.unwrap();
            assert_eq!(message(resp), json!(expected_message));
            settle().await;
            let last = broker.messages().pop().unwrap();
            assert_eq!(last.message_type, expected_type);
        }
        assert_eq!(broker.messages().len(), 6);
    }

    #[tokio::test]
    async fn resource_provider_create_keeps_url_from_body() {
        let broker = Arc::new(RecordingBroker::default());

        service(&broker)
            .oneshot(Operation::ResourceProviderCreate {
                ctx: ctx(),
                name: "local".to_string(),
                body: json!({"url": "http://localhost:8000"}).as_object().cloned(),
            })
            .await
            .unwrap();

        settle().await;
        assert_eq!(
            broker.messages()[0].body,
            json!({"url": "http://localhost:8000", "name": "local"})
        );
    }

    #[test]
    fn broker_failure_still_confirms_and_is_counted() {
        let broker = Arc::new(RecordingBroker::offline());
        let svc = service(&broker);

        let (resp, recorded) = run_recorded(async move {
            let resp = svc
                .oneshot(Operation::ArtifactStoreDelete {
                    ctx: ctx(),
                    name: "s3".to_string(),
                })
                .await;
            settle().await;
            resp
        });

        assert_eq!(message(resp.unwrap()), json!("Deleted Artifact Store s3"));
        assert!(broker.messages().is_empty());
        assert_eq!(
            recorded.counter(
                "bob_entity_events_failed_total",
                &[("event_type", "artifact-store/delete")]
            ),
            1
        );
    }

    #[tokio::test]
    async fn non_mutation_is_rejected() {
        let broker = Arc::new(RecordingBroker::default());
        let err = service(&broker)
            .oneshot(Operation::ArtifactStoreList { ctx: ctx() })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OperationError::WrongHandler {
                name: bob_core::OperationName::ArtifactStoreList
            }
        ));
        settle().await;
        assert!(broker.messages().is_empty());
    }
}
