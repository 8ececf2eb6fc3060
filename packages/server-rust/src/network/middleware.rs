//! HTTP middleware stack for the API server.
//!
//! Transport concerns only: request ids, tracing, compression, CORS, the
//! request deadline and the body limit. Operation-level concerns (deadline
//! per operation, load shedding, outcome metrics) live in the operation
//! pipeline.

use axum::extract::DefaultBodyLimit;
use axum::http::header::HeaderName;
use axum::http::{Method, StatusCode};
use axum::middleware::map_response;
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::config::NetworkConfig;
use super::handlers::response::envelope_bare_errors;

/// Header carrying the per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Wraps `router` in the HTTP middleware stack.
///
/// Outermost first:
/// 1. envelope mapping of bare error responses (408, 405)
/// 2. `SetRequestId` -- UUID v4 `x-request-id` unless the caller sent one
/// 3. `PropagateRequestId` -- echoes `x-request-id` on every response, 408 included
/// 4. `Trace`
/// 5. gzip `Compression`
/// 6. `CORS` for the configured origins
/// 7. `Timeout` -- 408 after `request_timeout`
/// 8. `DefaultBodyLimit` -- 413 once a handler buffers more than `max_body_bytes`
///
/// `Router::layer` wraps everything added before it, so the calls below run
/// innermost first.
pub fn apply_http_layers<S>(router: Router<S>, config: &NetworkConfig) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    router
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout,
        ))
        .layer(cors_layer(&config.cors_origins))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(map_response(envelope_bare_errors))
}

/// `"*"` anywhere in `origins` allows every origin; otherwise only the
/// origins that parse as header values are allowed.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins.iter().filter_map(|o| o.parse().ok()))
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any)
}
