//! OpenAPI Specification for the flare-jobs API
//!
//! Generated with utoipa from the entity types in `flare-core` and the route
//! annotations produced by [`entity_routes!`](crate::entity_routes).

use utoipa::OpenApi;

use crate::error::{ApiError, ErrorCode};
use crate::routes::generic::CountResponse;
use crate::routes::health::{
    ComponentHealth, HealthDetails, HealthResponse, HealthStatus, PingResponse,
};
use crate::routes::{health, job, node, socket};
use crate::telemetry::metrics;

use flare_core::{Job, Node, Socket};

/// OpenAPI document for the flare-jobs API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "flare-jobs API",
        version = "0.1.0",
        description = "Records of load-test jobs, the nodes executing them and the sockets each node opens",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local Development")
    ),
    tags(
        (name = "Jobs", description = "Load-test runs requested by a user for a task"),
        (name = "Nodes", description = "Workers executing a job and their connection counters"),
        (name = "Sockets", description = "Individual connection attempts made during a job"),
        (name = "Health", description = "Ping, liveness and readiness"),
        (name = "Observability", description = "Prometheus metrics")
    ),
    paths(
        // Jobs
        job::create,
        job::find,
        job::count,
        job::update_all,
        job::find_by_id,
        job::update_by_id,
        job::replace_by_id,
        job::delete_by_id,

        // Nodes
        node::create,
        node::find,
        node::count,
        node::update_all,
        node::find_by_id,
        node::update_by_id,
        node::replace_by_id,
        node::delete_by_id,

        // Sockets
        socket::create,
        socket::find,
        socket::count,
        socket::update_all,
        socket::find_by_id,
        socket::update_by_id,
        socket::replace_by_id,
        socket::delete_by_id,

        // Operational
        health::ping,
        health::liveness,
        health::readiness,
        metrics::metrics_handler,
    ),
    components(
        schemas(
            Job, Node, Socket,
            CountResponse,
            ApiError, ErrorCode,
            PingResponse, HealthResponse, HealthStatus, HealthDetails, ComponentHealth,
        )
    )
)]
pub struct ApiDoc;

impl ApiDoc {
    /// Generate OpenAPI spec as JSON string.
    pub fn to_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::openapi())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_generation() -> Result<(), String> {
        let openapi = ApiDoc::openapi();

        assert_eq!(openapi.info.title, "flare-jobs API");
        assert_eq!(openapi.info.version, "0.1.0");

        let tags = openapi
            .tags
            .as_ref()
            .ok_or_else(|| "OpenAPI tags missing".to_string())?;
        assert_eq!(tags.len(), 5);

        let components = openapi
            .components
            .as_ref()
            .ok_or_else(|| "OpenAPI components missing".to_string())?;
        for schema in ["Job", "Node", "Socket", "ApiError", "CountResponse"] {
            assert!(components.schemas.contains_key(schema), "missing {}", schema);
        }
        Ok(())
    }

    #[test]
    fn test_entity_paths_documented() {
        let openapi = ApiDoc::openapi();
        for path in [
            "/jobs",
            "/jobs/count",
            "/jobs/{id}",
            "/nodes",
            "/nodes/{id}",
            "/sockets/count",
            "/ping",
            "/health/ready",
            "/metrics",
        ] {
            assert!(openapi.paths.paths.contains_key(path), "missing path {}", path);
        }
    }

    #[test]
    fn test_openapi_json_serialization() -> Result<(), String> {
        let json = ApiDoc::to_json().map_err(|e| format!("Failed to serialize OpenAPI: {}", e))?;

        serde_json::from_str::<serde_json::Value>(&json)
            .map_err(|e| format!("Generated JSON invalid: {}", e))?;

        assert!(json.contains("flare-jobs API"));
        assert!(json.contains("totalFailedConnections"));
        Ok(())
    }
}
