//! Network module with deferred startup lifecycle.
//!
//! Implements the deferred startup pattern: `new()` assembles shared state,
//! `start()` binds the TCP listener, and `serve()` starts accepting
//! connections. This separation lets the binary report the bound port (and
//! fail fast on bind errors) before any request is served.

use std::future::Future;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use super::config::NetworkConfig;
use super::handlers::{
    api_spec_handler, artifact_store_create_handler, artifact_store_delete_handler,
    artifact_store_list_handler, cctray_handler, health_handler, metrics_handler, not_found_handler,
    pipeline_artifact_handler, pipeline_create_handler, pipeline_delete_handler,
    pipeline_list_handler, pipeline_logs_handler, pipeline_start_handler, pipeline_status_handler,
    pipeline_stop_handler, resource_provider_create_handler, resource_provider_delete_handler,
    resource_provider_list_handler, AppState, MetricsEndpoint,
};
use super::middleware::apply_http_layers;
use crate::service::Dispatcher;

/// Manages the HTTP server lifecycle.
///
/// 1. `new()` -- assembles the shared handler state
/// 2. `start()` -- binds TCP listener to the configured address
/// 3. `serve()` -- accepts connections until shutdown is signalled
pub struct NetworkModule {
    config: NetworkConfig,
    listener: Option<TcpListener>,
    state: AppState,
}

impl NetworkModule {
    /// Creates a new network module without binding any port.
    #[must_use]
    pub fn new(
        config: NetworkConfig,
        dispatcher: Dispatcher,
        metrics: Option<MetricsEndpoint>,
    ) -> Self {
        let state = AppState {
            dispatcher,
            config: Arc::new(config.clone()),
            metrics,
        };
        Self {
            config,
            listener: None,
            state,
        }
    }

    /// Assembles the axum router with all routes and middleware.
    pub fn build_router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Binds the TCP listener to the configured host and port.
    ///
    /// Returns the actual bound port, which may differ from the configured
    /// port when port 0 is used (OS-assigned ephemeral port).
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound (e.g., port in use).
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!("TCP listener bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves connections until the shutdown signal fires, then lets
    /// in-flight requests finish.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called first, or if the server
    /// encounters a fatal I/O error.
    pub async fn serve(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let Some(listener) = self.listener else {
            anyhow::bail!("start() must be called before serve()");
        };
        let router = build_router(self.state);

        info!("Serving HTTP connections");
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;
        info!("HTTP server stopped");
        Ok(())
    }
}

/// Assembles the axum router for `state`.
///
/// Routes map one to one onto declared operations, plus `GET /metrics`.
pub fn build_router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/can-we-build-it", get(health_handler))
        .route("/api.yaml", get(api_spec_handler))
        .route("/metrics", get(metrics_handler))
        .route("/cctray.xml", get(cctray_handler))
        .route("/pipelines", get(pipeline_list_handler))
        .route(
            "/pipelines/groups/{group}/names/{name}",
            post(pipeline_create_handler).delete(pipeline_delete_handler),
        )
        .route(
            "/pipelines/start/groups/{group}/names/{name}",
            post(pipeline_start_handler),
        )
        .route(
            "/pipelines/stop/groups/{group}/names/{name}/number/{number}",
            post(pipeline_stop_handler),
        )
        .route(
            "/pipelines/logs/groups/{group}/names/{name}/number/{number}/offset/{offset}/lines/{lines}",
            get(pipeline_logs_handler),
        )
        .route(
            "/pipelines/status/groups/{group}/names/{name}/number/{number}",
            get(pipeline_status_handler),
        )
        .route(
            "/pipelines/groups/{group}/names/{name}/number/{number}/artifact-stores/{store}/artifact/{artifact}",
            get(pipeline_artifact_handler),
        )
        .route("/resource-providers", get(resource_provider_list_handler))
        .route(
            "/resource-providers/{name}",
            post(resource_provider_create_handler).delete(resource_provider_delete_handler),
        )
        .route("/artifact-stores", get(artifact_store_list_handler))
        .route(
            "/artifact-stores/{name}",
            post(artifact_store_create_handler).delete(artifact_store_delete_handler),
        )
        .fallback(not_found_handler);

    apply_http_layers(routes, &state.config).with_state(state)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
