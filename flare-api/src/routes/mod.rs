//! REST API Routes Module
//!
//! Includes:
//! - Entity CRUD routes (jobs, nodes, sockets)
//! - Ping and health check endpoints (Kubernetes-compatible)
//! - Prometheus metrics
//! - CORS support for browser-based clients

pub mod generic;
pub mod health;
pub mod job;
pub mod node;
pub mod socket;

use std::time::Duration;

use axum::{
    http::{header, Method},
    middleware::from_fn,
    routing::get,
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::ApiConfig;
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};

pub use health::create_router as health_router;
pub use job::create_router as job_router;
pub use node::create_router as node_router;
pub use socket::create_router as socket_router;

// ============================================================================
// OPENAPI ENDPOINT
// ============================================================================

/// Handler for /openapi.json endpoint.
#[cfg(feature = "openapi")]
async fn openapi_json() -> impl axum::response::IntoResponse {
    use utoipa::OpenApi;

    axum::Json(crate::openapi::ApiDoc::openapi())
}

// ============================================================================
// CORS LAYER
// ============================================================================

/// Build the CORS layer from ApiConfig.
///
/// In development mode (empty origins), allows all origins.
/// In production mode, only allows configured origins.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any).allow_headers(Any)
    } else {
        tracing::info!(
            "CORS: Production mode - allowing origins: {:?}",
            config.cors_origins
        );
        // Exact entries and `*.domain` wildcards share one matcher.
        let config = config.clone();
        cors.allow_origin(AllowOrigin::predicate(move |origin, _parts| {
            origin
                .to_str()
                .map(|o| config.is_origin_allowed(o))
                .unwrap_or(false)
        }))
    }
}

// ============================================================================
// ROUTER
// ============================================================================

/// Routes for all three entities, still waiting for their state.
pub fn entity_routes() -> Router<AppState> {
    Router::new()
        .nest("/jobs", job::create_router())
        .nest("/nodes", node::create_router())
        .nest("/sockets", socket::create_router())
}

/// Create the complete API router.
///
/// - Entity CRUD at /jobs, /nodes, /sockets
/// - Ping at /ping, health checks at /health/*
/// - Metrics at /metrics
/// - OpenAPI document at /openapi.json (openapi feature)
///
/// Execution order: CORS -> Observability -> Handler
pub fn create_api_router(state: AppState, config: &ApiConfig) -> Router {
    let router = entity_routes()
        .route("/ping", get(health::ping))
        .nest("/health", health::create_router())
        .route("/metrics", get(metrics_handler));

    #[cfg(feature = "openapi")]
    let router = router.route("/openapi.json", get(openapi_json));

    router
        .with_state(state)
        .layer(from_fn(observability_middleware))
        .layer(build_cors_layer(config))
}
