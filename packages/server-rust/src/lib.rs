//! Bob API server: HTTP gateway that publishes entity events to a broker,
//! forwards reads to the query service, and aggregates dependency health.

pub mod broker;
pub mod config;
pub mod health;
pub mod network;
pub mod query;
pub mod service;
pub mod telemetry;
pub mod traits;

pub use broker::{BrokerConfig, EntityPublisher, NatsBroker};
pub use config::{Cli, LogFormat};
pub use health::{HealthAggregator, HealthConfig, HealthReport};
pub use network::{MetricsEndpoint, NetworkConfig, NetworkModule};
pub use query::{QueryConfig, QueryError, QueryForwarder};
pub use service::{Dispatcher, Operation, OperationError, OperationResponse, ServerConfig};
pub use traits::{BrokerClient, Probe};
