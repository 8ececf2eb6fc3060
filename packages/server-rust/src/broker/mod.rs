//! Broker publishing for entity lifecycle events.
//!
//! [`EntityPublisher`] is deliberately fire-and-forget: `publish()` hands the
//! event to a detached task and returns immediately. The outcome is only
//! observed through logs and the `bob_entity_events_*` counters; it is never
//! reported back to the HTTP caller, and failed publishes are not retried.

pub mod nats;

use std::sync::Arc;
use std::time::Duration;

use bob_core::EntityEvent;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::traits::BrokerClient;

pub use nats::NatsBroker;

const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_millis(5000);

// ---------------------------------------------------------------------------
// BrokerConfig
// ---------------------------------------------------------------------------

/// Broker connection and channel settings.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Broker URL, e.g. `nats://localhost:4222`.
    pub url: String,
    /// Optional user for authenticated connections.
    pub user: Option<String>,
    /// Optional password, used together with `user`.
    pub password: Option<String>,
    /// The single subject every entity event is published on.
    pub subject: String,
    /// Number of connection attempts at startup before giving up.
    pub connect_attempts: u32,
    /// Delay between connection attempts.
    pub connect_retry_delay: Duration,
    /// Upper bound on one publish. A publish still pending when it elapses
    /// counts as failed.
    pub publish_timeout: Duration,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
            user: None,
            password: None,
            subject: "bob.entities".to_string(),
            connect_attempts: 10,
            connect_retry_delay: Duration::from_millis(2000),
            publish_timeout: DEFAULT_PUBLISH_TIMEOUT,
        }
    }
}

// ---------------------------------------------------------------------------
// EntityPublisher
// ---------------------------------------------------------------------------

/// Submits entity events to the broker without waiting for the outcome.
#[derive(Clone)]
pub struct EntityPublisher {
    client: Arc<dyn BrokerClient>,
    subject: Arc<str>,
    publish_timeout: Duration,
}

impl EntityPublisher {
    /// Create a publisher sending every event on `subject`.
    #[must_use]
    pub fn new(client: Arc<dyn BrokerClient>, subject: impl Into<Arc<str>>) -> Self {
        Self {
            client,
            subject: subject.into(),
            publish_timeout: DEFAULT_PUBLISH_TIMEOUT,
        }
    }

    /// Give up on a publish that has not completed after `timeout`.
    #[must_use]
    pub fn with_publish_timeout(mut self, timeout: Duration) -> Self {
        self.publish_timeout = timeout;
        self
    }

    /// The subject events are published on.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Submit `event` and detach.
    ///
    /// The event is fully encoded before the task is spawned. Callers on the
    /// request path drop the returned handle; it exists so tests can wait
    /// for the background publish to settle.
    ///
    /// Must be called from within a tokio runtime.
    pub fn publish(&self, event: EntityEvent) -> JoinHandle<()> {
        let client = Arc::clone(&self.client);
        let subject = Arc::clone(&self.subject);
        let event_type = event.event_type.as_str();
        let body = event.body();
        let timeout = self.publish_timeout;

        tokio::spawn(async move {
            let publish = client.publish(&subject, event_type, body.into());
            let result = tokio::time::timeout(timeout, publish)
                .await
                .unwrap_or_else(|_| {
                    Err(anyhow::anyhow!(
                        "publish did not complete within {}ms",
                        timeout.as_millis()
                    ))
                });

            match result {
                Ok(()) => {
                    debug!(subject = %subject, event_type, "Published entity event");
                    metrics::counter!("bob_entity_events_published_total", "event_type" => event_type)
                        .increment(1);
                }
                Err(e) => {
                    error!(subject = %subject, event_type, error = %e, "Error publishing entity event");
                    metrics::counter!("bob_entity_events_failed_total", "event_type" => event_type)
                        .increment(1);
                }
            }
        })
    }
}

impl std::fmt::Debug for EntityPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityPublisher")
            .field("subject", &self.subject)
            .field("publish_timeout", &self.publish_timeout)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
