//! HTTP transport: configuration, middleware, handlers, and server lifecycle.

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod module;

pub use config::NetworkConfig;
pub use handlers::{AppState, MetricsEndpoint};
pub use module::{build_router, NetworkModule};
