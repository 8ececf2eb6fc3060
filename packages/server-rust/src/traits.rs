use async_trait::async_trait;
use bytes::Bytes;

/// Publish-capable message broker connection.
///
/// One long-lived client is shared by every request task, so implementations
/// must be safe for concurrent use without external locking.
/// Implementations: NATS (`broker::nats`), in-memory fakes (tests).
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Publish `body` on `subject`, tagging it with `message_type`.
    ///
    /// Resolves once the broker connection has accepted the message.
    async fn publish(&self, subject: &str, message_type: &str, body: Bytes) -> anyhow::Result<()>;

    /// Whether the connection to the broker is currently established.
    fn is_connected(&self) -> bool;
}

/// A single reachability check against one dependency.
///
/// Probes are run concurrently by the `HealthAggregator`; each one must be
/// independent of the others.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Dependency name reported in health responses and logs.
    fn name(&self) -> &'static str;

    /// Check the dependency. `Err` carries the reason it is unhealthy.
    async fn check(&self) -> anyhow::Result<()>;
}
