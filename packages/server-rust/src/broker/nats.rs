//! NATS adapter for [`BrokerClient`].
//!
//! Entity events are plain core-NATS publishes on a single subject. The event
//! type travels in the `type` header so consumers can route on it without
//! decoding the body.

use async_nats::connection::State;
use async_nats::{ConnectOptions, HeaderMap};
use async_trait::async_trait;
use bytes::Bytes;
use tracing::{info, warn};

use super::BrokerConfig;
use crate::traits::BrokerClient;

/// Header carrying the entity event type.
pub const MESSAGE_TYPE_HEADER: &str = "type";

/// Name this process announces to the NATS server.
const CONNECTION_NAME: &str = "bob-apiserver";

/// Broker client backed by a shared `async_nats::Client`.
///
/// The client multiplexes every publish over one connection and reconnects
/// on its own, so a single instance is shared by all request tasks.
#[derive(Debug, Clone)]
pub struct NatsBroker {
    client: async_nats::Client,
}

impl NatsBroker {
    /// Wrap an already connected client.
    #[must_use]
    pub fn new(client: async_nats::Client) -> Self {
        Self { client }
    }

    /// Connect to the broker, retrying up to `config.connect_attempts` times.
    ///
    /// # Errors
    ///
    /// Returns an error carrying the last failure once every attempt has failed.
    pub async fn connect(config: &BrokerConfig) -> anyhow::Result<Self> {
        let attempts = config.connect_attempts.max(1);
        let mut attempt = 1;

        loop {
            match connect_options(config).connect(config.url.as_str()).await {
                Ok(client) => {
                    info!(url = %config.url, attempt, "Connected to broker");
                    return Ok(Self::new(client));
                }
                Err(e) if attempt < attempts => {
                    warn!(
                        url = %config.url,
                        attempt,
                        remaining = attempts - attempt,
                        error = %e,
                        "Broker connection failed, retrying"
                    );
                    tokio::time::sleep(config.connect_retry_delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(anyhow::anyhow!(
                        "could not connect to broker at {} after {attempts} attempts: {e}",
                        config.url
                    ));
                }
            }
        }
    }

    /// Flush messages still buffered by the client. Called on shutdown.
    pub async fn flush(&self) {
        if let Err(e) = self.client.flush().await {
            warn!(error = %e, "Failed to flush broker connection on shutdown");
        }
    }
}

fn connect_options(config: &BrokerConfig) -> ConnectOptions {
    let options = ConnectOptions::new().name(CONNECTION_NAME);
    match (&config.user, &config.password) {
        (Some(user), Some(password)) => options.user_and_password(user.clone(), password.clone()),
        _ => options,
    }
}

#[async_trait]
impl BrokerClient for NatsBroker {
    async fn publish(&self, subject: &str, message_type: &str, body: Bytes) -> anyhow::Result<()> {
        // While reconnecting the client queues commands instead of failing them.
        if !self.is_connected() {
            anyhow::bail!("broker connection is not established");
        }

        let mut headers = HeaderMap::new();
        headers.insert(MESSAGE_TYPE_HEADER, message_type);

        self.client
            .publish_with_headers(subject.to_string(), headers, body)
            .await?;
        // Publishing only buffers locally; flushing surfaces a dead connection.
        self.client.flush().await?;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        matches!(self.client.connection_state(), State::Connected)
    }
}
