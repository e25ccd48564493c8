//! End-to-end smoke tests for the operational endpoints.

use axum::http::{Method, StatusCode};
use flare_test_utils::fixtures::job_body;

#[path = "support/http.rs"]
mod http_support;
use http_support::*;

#[tokio::test]
async fn smoke_test_ping_echoes_request() {
    let app = test_app();
    let (status, body) = send(&app, Method::GET, "/ping?probe=1", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["greeting"], "Hello from flare-jobs");
    assert_eq!(body["url"], "/ping?probe=1");
    assert!(body["date"].as_str().is_some());
    assert!(body["headers"].is_object());
}

#[tokio::test]
async fn smoke_test_health_endpoints() {
    let app = test_app();

    let (status, live) = get(&app, "/health/live").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(live["status"], "healthy");

    let (status, ready) = get(&app, "/health/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ready["details"]["store"]["kind"], "memory");
}

#[tokio::test]
async fn smoke_test_metrics_after_traffic() {
    let app = test_app();
    create(&app, "/jobs", &job_body()).await;

    let (status, body) = get(&app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    let text = body.as_str().unwrap_or_default();
    assert!(text.contains("flare_http_requests_total"));
}

#[cfg(feature = "openapi")]
#[tokio::test]
async fn smoke_test_openapi_document() {
    let app = test_app();
    let (status, doc) = get(&app, "/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/sockets/count"].is_object());
}

#[tokio::test]
async fn smoke_test_full_crud_chain() {
    let app = test_app();

    let job = create(&app, "/jobs", &job_body()).await;
    let job_id = job["id"].as_str().unwrap();

    let node = create(
        &app,
        "/nodes",
        &serde_json::json!({"jobId": job_id, "name": "n1", "running": true}),
    )
    .await;
    let socket = create(
        &app,
        "/sockets",
        &serde_json::json!({"jobId": job_id, "connected": true, "timeToConnection": 12.5}),
    )
    .await;
    assert_eq!(socket["timeToConnection"], 12.5);

    let node_uri = format!("/nodes/{}", node["id"].as_str().unwrap());
    let (status, _) = patch(&app, &node_uri, &serde_json::json!({"running": false})).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let job_uri = format!("/jobs/{}", job_id);
    let (status, _) = patch(&app, &job_uri, &serde_json::json!({"isRunning": false, "passed": true})).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    for uri in [
        format!("/sockets/{}", socket["id"].as_str().unwrap()),
        node_uri,
        job_uri,
    ] {
        assert_eq!(delete(&app, &uri).await.0, StatusCode::NO_CONTENT);
    }
    for collection in ["/jobs/count", "/nodes/count", "/sockets/count"] {
        assert_eq!(get(&app, collection).await.1["count"], 0);
    }
}
