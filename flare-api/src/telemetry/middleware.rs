//! Axum Middleware for HTTP Request Tracing and Metrics
//!
//! Provides automatic instrumentation of all HTTP requests with:
//! - A tracing span per request
//! - Prometheus metrics collection
//! - Request completion logging

use axum::{extract::Request, middleware::Next, response::Response};
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Instant;
use tracing::{info_span, Instrument};

use super::metrics::METRICS;

/// `/{collection}/{id}` where the id segment is anything but a fixed route.
static ENTITY_ID_PATH: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"^/(jobs|nodes|sockets)/([^/]+)(/.*)?$").ok()
});

/// Normalize path for metrics/spans (replace record ids with a placeholder).
///
/// Ids are caller-chosen strings, so the collection layout is matched rather
/// than the id shape. This keeps Prometheus label cardinality bounded.
pub fn normalize_path(path: &str) -> String {
    let Some(pattern) = ENTITY_ID_PATH.as_ref() else {
        return path.to_string();
    };
    match pattern.captures(path) {
        Some(caps) if &caps[2] != "count" => format!(
            "/{}/{{id}}{}",
            &caps[1],
            caps.get(3).map_or("", |m| m.as_str())
        ),
        _ => path.to_string(),
    }
}

/// Observability middleware for Axum.
///
/// This middleware wraps every request with:
/// 1. A tracing span carrying method and normalized route
/// 2. Prometheus metrics recording
/// 3. Request/response logging
pub async fn observability_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let normalized_path = normalize_path(&path);

    let span = info_span!(
        "http_request",
        http.method = %method,
        http.target = %path,
        http.route = %normalized_path,
    );

    let response = next.run(request).instrument(span).await;

    let duration = start.elapsed();
    let status = response.status();

    if let Ok(metrics) = METRICS.as_ref() {
        metrics.record_http_request(
            method.as_str(),
            &normalized_path,
            status.as_u16(),
            duration.as_secs_f64(),
        );
    }

    tracing::info!(
        method = %method,
        path = %path,
        status = status.as_u16(),
        duration_ms = duration.as_millis() as u64,
        "Request completed"
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_uuid() {
        let path = "/jobs/550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(normalize_path(path), "/jobs/{id}");
    }

    #[test]
    fn test_normalize_path_custom_id() {
        assert_eq!(normalize_path("/sockets/my-socket_7"), "/sockets/{id}");
        assert_eq!(normalize_path("/nodes/42"), "/nodes/{id}");
    }

    #[test]
    fn test_normalize_path_keeps_fixed_routes() {
        assert_eq!(normalize_path("/nodes/count"), "/nodes/count");
        assert_eq!(normalize_path("/jobs"), "/jobs");
        assert_eq!(normalize_path("/health/ready"), "/health/ready");
        assert_eq!(normalize_path("/ping"), "/ping");
    }
}
