//! Socket collection over HTTP: time-window counts, ordering with limit and
//! projection.

use axum::http::StatusCode;
use flare_test_utils::fixtures::{socket_body, time_window_sockets, time_window_where, TIME_JOB};
use serde_json::json;

#[path = "support/http.rs"]
mod http_support;
use http_support::*;

async fn seeded_app() -> axum::Router {
    let app = test_app();
    for body in time_window_sockets() {
        create(&app, "/sockets", &body).await;
    }
    app
}

#[tokio::test]
async fn test_create_socket() {
    let app = test_app();
    let socket = create(&app, "/sockets", &socket_body("abc123")).await;

    assert!(socket["id"].as_str().is_some_and(|id| !id.is_empty()));
    assert_eq!(socket["connected"], true);
    assert_eq!(socket["hasError"], serde_json::Value::Null);
    assert!(socket.get("createdAt").is_none());
}

#[tokio::test]
async fn test_list_sockets() {
    let app = test_app();
    for _ in 0..3 {
        create(&app, "/sockets", &socket_body("abc123")).await;
    }
    let (status, all) = get(&app, "/sockets").await;
    assert_eq!(status, StatusCode::OK);
    assert!(all.as_array().unwrap().len() >= 3);
}

#[tokio::test]
async fn test_count_connected_sockets_in_time_window() {
    let app = seeded_app().await;

    let uri = with_json_param("/sockets/count", "where", &time_window_where(12, 22));
    let (status, body) = get(&app, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 4);

    let uri = with_json_param("/sockets/count", "where", &time_window_where(22, 32));
    assert_eq!(get(&app, &uri).await.1["count"], 2);

    // Bounds are inclusive.
    let uri = with_json_param("/sockets/count", "where", &time_window_where(13, 13));
    assert_eq!(get(&app, &uri).await.1["count"], 1);

    assert_eq!(get(&app, "/sockets/count").await.1["count"], 8);
}

#[tokio::test]
async fn test_latest_and_earliest_connection_time() {
    let app = seeded_app().await;

    let latest = with_json_param(
        "/sockets",
        "filter",
        &json!({
            "where": {"jobId": TIME_JOB, "connected": true},
            "order": ["connectionTime DESC"],
            "limit": 1,
            "fields": {"connectionTime": true}
        }),
    );
    let (status, rows) = get(&app, &latest).await;
    assert_eq!(status, StatusCode::OK);
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["connectionTime"], "2019-03-09T11:51:24Z");
    let keys: Vec<_> = rows[0].as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys, ["connectionTime", "id"]);

    let earliest = with_json_param(
        "/sockets",
        "filter",
        &json!({
            "where": {"jobId": TIME_JOB, "connected": true},
            "order": "connectionTime ASC",
            "limit": 1
        }),
    );
    let (_, rows) = get(&app, &earliest).await;
    assert_eq!(rows[0]["connectionTime"], "2019-03-09T11:51:13Z");
    assert_eq!(rows[0]["jobId"], TIME_JOB);
}

#[tokio::test]
async fn test_skip_pages_through_ordered_rows() {
    let app = seeded_app().await;
    let uri = with_json_param(
        "/sockets",
        "filter",
        &json!({
            "where": {"jobId": TIME_JOB, "connected": true},
            "order": ["connectionTime ASC"],
            "skip": 4,
            "limit": 10
        }),
    );
    let (_, rows) = get(&app, &uri).await;
    let times: Vec<_> = rows
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["connectionTime"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(times, ["2019-03-09T11:51:23Z", "2019-03-09T11:51:24Z"]);
}

#[tokio::test]
async fn test_mark_errors_in_bulk() {
    let app = seeded_app().await;

    let uri = with_json_param("/sockets", "where", &json!({"connected": false}));
    let (status, body) = patch(
        &app,
        &uri,
        &json!({"hasError": true, "errorTime": "2019-03-09T11:52:00Z"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    let uri = with_json_param("/sockets/count", "where", &json!({"errorTime": {"neq": null}}));
    assert_eq!(get(&app, &uri).await.1["count"], 1);
}

#[tokio::test]
async fn test_bad_timestamp_is_400() {
    let app = test_app();
    let (status, err) = post(
        &app,
        "/sockets",
        &json!({"jobId": "j", "connectionTime": "yesterday"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "VALIDATION_FAILED");
}
