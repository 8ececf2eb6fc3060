//! Command-line and environment configuration.
//!
//! Every flag can also be set through its `BOB_*` environment variable. The
//! parsed [`Cli`] is split into the per-component configs consumed by the
//! rest of the crate.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::broker::BrokerConfig;
use crate::health::HealthConfig;
use crate::network::NetworkConfig;
use crate::query::QueryConfig;
use crate::service::domain::ResourceConfig;
use crate::service::ServerConfig;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per event.
    Json,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "bob-apiserver")]
#[command(about = "HTTP gateway for the Bob CI server", long_about = None)]
pub struct Cli {
    /// Address to bind the HTTP server to
    #[arg(long, env = "BOB_API_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on (0 picks a free port)
    #[arg(long, env = "BOB_API_PORT", default_value = "7777")]
    pub port: u16,

    /// Allowed CORS origins, comma separated
    #[arg(long, env = "BOB_CORS_ORIGINS", default_value = "*", value_delimiter = ',')]
    pub cors_origins: Vec<String>,

    /// Broker URL
    #[arg(long, env = "BOB_QUEUE_URL", default_value = "nats://localhost:4222")]
    pub queue_url: String,

    /// Broker user
    #[arg(long, env = "BOB_QUEUE_USER")]
    pub queue_user: Option<String>,

    /// Broker password
    #[arg(long, env = "BOB_QUEUE_PASSWORD", hide_env_values = true)]
    pub queue_password: Option<String>,

    /// Subject entity events are published on
    #[arg(long, env = "BOB_QUEUE_SUBJECT", default_value = "bob.entities")]
    pub queue_subject: String,

    /// Publish timeout, in milliseconds
    #[arg(long, env = "BOB_QUEUE_PUBLISH_TIMEOUT", default_value = "5000")]
    pub queue_publish_timeout: u64,

    /// Base URL of the downstream query service
    #[arg(long, env = "BOB_QUERY_URL", default_value = "http://localhost:7779")]
    pub query_url: String,

    /// Downstream query timeout, in milliseconds
    #[arg(long, env = "BOB_QUERY_TIMEOUT", default_value = "10000")]
    pub query_timeout: u64,

    /// Path of the OpenAPI document served at /api.yaml
    #[arg(long, env = "BOB_API_SPEC", default_value = "bob/api.yaml")]
    pub api_spec: PathBuf,

    /// Root directory of stored pipeline artifacts
    #[arg(long, env = "BOB_ARTIFACTS_DIR", default_value = "artifacts")]
    pub artifacts_dir: PathBuf,

    /// Per-probe health check timeout, in milliseconds
    #[arg(long, env = "BOB_HEALTH_CHECK_TIMEOUT", default_value = "3000")]
    pub health_check_timeout: u64,

    /// Broker connection attempts at startup
    #[arg(long, env = "BOB_CONNECTION_RETRY_ATTEMPTS", default_value = "10")]
    pub connection_retry_attempts: u32,

    /// Delay between broker connection attempts, in milliseconds
    #[arg(long, env = "BOB_CONNECTION_RETRY_DELAY", default_value = "2000")]
    pub connection_retry_delay: u64,

    /// Operation timeout, in milliseconds
    #[arg(long, env = "BOB_OPERATION_TIMEOUT", default_value = "30000")]
    pub operation_timeout: u64,

    /// Operations in flight before new ones are shed
    #[arg(long, env = "BOB_MAX_CONCURRENT_OPERATIONS", default_value = "1000")]
    pub max_concurrent_operations: u32,

    /// HTTP request timeout, in milliseconds
    #[arg(long, env = "BOB_REQUEST_TIMEOUT", default_value = "30000")]
    pub request_timeout: u64,

    /// Largest accepted request body, in bytes
    #[arg(long, env = "BOB_MAX_BODY_BYTES", default_value = "1048576")]
    pub max_body_bytes: usize,

    /// Log output format
    #[arg(long, env = "BOB_LOG_FORMAT", value_enum, default_value = "text")]
    pub log_format: LogFormat,

    /// Expose Prometheus metrics at /metrics
    #[arg(long, env = "BOB_METRICS", default_value = "true", action = clap::ArgAction::Set)]
    pub metrics: bool,
}

impl Cli {
    #[must_use]
    pub fn network(&self) -> NetworkConfig {
        NetworkConfig {
            host: self.host.clone(),
            port: self.port,
            cors_origins: self.cors_origins.clone(),
            request_timeout: Duration::from_millis(self.request_timeout),
            max_body_bytes: self.max_body_bytes,
        }
    }

    #[must_use]
    pub fn server(&self) -> ServerConfig {
        ServerConfig {
            default_operation_timeout_ms: self.operation_timeout,
            max_concurrent_operations: self.max_concurrent_operations,
        }
    }

    #[must_use]
    pub fn broker(&self) -> BrokerConfig {
        BrokerConfig {
            url: self.queue_url.clone(),
            user: self.queue_user.clone(),
            password: self.queue_password.clone(),
            subject: self.queue_subject.clone(),
            connect_attempts: self.connection_retry_attempts,
            connect_retry_delay: Duration::from_millis(self.connection_retry_delay),
            publish_timeout: Duration::from_millis(self.queue_publish_timeout),
        }
    }

    #[must_use]
    pub fn query(&self) -> QueryConfig {
        QueryConfig {
            base_url: self.query_url.clone(),
            request_timeout: Duration::from_millis(self.query_timeout),
        }
    }

    #[must_use]
    pub fn health(&self) -> HealthConfig {
        HealthConfig {
            probe_timeout: Duration::from_millis(self.health_check_timeout),
        }
    }

    #[must_use]
    pub fn resources(&self) -> ResourceConfig {
        ResourceConfig {
            api_spec: self.api_spec.clone(),
            artifacts_dir: self.artifacts_dir.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env vars are not cleared here; CI does not set BOB_*.
    #[test]
    fn defaults_match_component_defaults() {
        let cli = Cli::parse_from(["bob-apiserver"]);

        let network = cli.network();
        let expected = NetworkConfig::default();
        assert_eq!(network.host, expected.host);
        assert_eq!(network.port, expected.port);
        assert_eq!(network.cors_origins, expected.cors_origins);
        assert_eq!(network.request_timeout, expected.request_timeout);
        assert_eq!(network.max_body_bytes, expected.max_body_bytes);

        let broker = cli.broker();
        let expected = BrokerConfig::default();
        assert_eq!(broker.url, expected.url);
        assert_eq!(broker.subject, expected.subject);
        assert_eq!(broker.connect_attempts, expected.connect_attempts);
        assert_eq!(broker.connect_retry_delay, expected.connect_retry_delay);
        assert_eq!(broker.publish_timeout, expected.publish_timeout);
        assert!(broker.user.is_none());
        assert!(broker.password.is_none());

        assert_eq!(cli.query().base_url, QueryConfig::default().base_url);
        assert_eq!(
            cli.query().request_timeout,
            QueryConfig::default().request_timeout
        );
        assert_eq!(cli.health().probe_timeout, HealthConfig::default().probe_timeout);
        assert_eq!(
            cli.server().default_operation_timeout_ms,
            ServerConfig::default().default_operation_timeout_ms
        );
        assert_eq!(
            cli.server().max_concurrent_operations,
            ServerConfig::default().max_concurrent_operations
        );
        assert_eq!(cli.resources().api_spec, ResourceConfig::default().api_spec);
        assert_eq!(cli.log_format, LogFormat::Text);
        assert!(cli.metrics);
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from([
            "bob-apiserver",
            "--port",
            "0",
            "--cors-origins",
            "http://a.example,http://b.example",
            "--queue-user",
            "bob",
            "--queue-password",
            "secret",
            "--health-check-timeout",
            "250",
            "--query-timeout",
            "1500",
            "--queue-publish-timeout",
            "750",
            "--log-format",
            "json",
            "--metrics",
            "false",
        ]);

        assert_eq!(cli.network().port, 0);
        assert_eq!(
            cli.network().cors_origins,
            vec!["http://a.example", "http://b.example"]
        );
        assert_eq!(cli.broker().user.as_deref(), Some("bob"));
        assert_eq!(cli.broker().password.as_deref(), Some("secret"));
        assert_eq!(cli.health().probe_timeout, Duration::from_millis(250));
        assert_eq!(cli.query().request_timeout, Duration::from_millis(1500));
        assert_eq!(cli.broker().publish_timeout, Duration::from_millis(750));
        assert_eq!(cli.log_format, LogFormat::Json);
        assert!(!cli.metrics);
    }

    #[test]
    fn rejects_unknown_log_format() {
        assert!(Cli::try_parse_from(["bob-apiserver", "--log-format", "xml"]).is_err());
    }
}
