//! Probes for the gateway's two dependencies.

use std::sync::Arc;

use async_trait::async_trait;

use crate::query::QueryForwarder;
use crate::traits::{BrokerClient, Probe};

/// Healthy while the broker client reports an established connection.
pub struct BrokerProbe {
    client: Arc<dyn BrokerClient>,
}

impl BrokerProbe {
    #[must_use]
    pub fn new(client: Arc<dyn BrokerClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Probe for BrokerProbe {
    fn name(&self) -> &'static str {
        "broker"
    }

    async fn check(&self) -> anyhow::Result<()> {
        if self.client.is_connected() {
            Ok(())
        } else {
            anyhow::bail!("broker connection is not established")
        }
    }
}

/// Healthy while the query service answers `GET /` with a success status.
pub struct QueryServiceProbe {
    forwarder: QueryForwarder,
}

impl QueryServiceProbe {
    #[must_use]
    pub fn new(forwarder: QueryForwarder) -> Self {
        Self { forwarder }
    }
}

#[async_trait]
impl Probe for QueryServiceProbe {
    fn name(&self) -> &'static str {
        "query-service"
    }

    async fn check(&self) -> anyhow::Result<()> {
        self.forwarder.ping().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::broker::tests::RecordingBroker;

    #[tokio::test]
    async fn broker_probe_follows_connection_state() {
        let up = BrokerProbe::new(Arc::new(RecordingBroker::default()));
        assert!(up.check().await.is_ok());

        let down = BrokerProbe::new(Arc::new(RecordingBroker::offline()));
        let err = down.check().await.unwrap_err();
        assert!(err.to_string().contains("not established"));
    }

    #[tokio::test]
    async fn query_service_probe_pings_root() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let probe = QueryServiceProbe::new(QueryForwarder::with_client(
            reqwest::Client::new(),
            &server.uri(),
        ));
        probe.check().await.unwrap();
    }

    #[tokio::test]
    async fn query_service_probe_fails_when_unreachable() {
        let probe = QueryServiceProbe::new(QueryForwarder::with_client(
            reqwest::Client::new(),
            "http://127.0.0.1:1",
        ));
        assert!(probe.check().await.is_err());
    }

    #[test]
    fn probe_names() {
        let broker = BrokerProbe::new(Arc::new(RecordingBroker::default()));
        let query = QueryServiceProbe::new(QueryForwarder::with_client(
            reqwest::Client::new(),
            "http://localhost:7779",
        ));
        assert_eq!(broker.name(), "broker");
        assert_eq!(query.name(), "query-service");
    }
}
