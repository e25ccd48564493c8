//! Drive the full router in-process over the in-memory backend.
#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use flare_api::{create_api_router, ApiConfig, AppState};
use flare_test_utils::memory_backend;
use serde_json::Value as JsonValue;
use tower::ServiceExt;

pub fn test_app() -> Router {
    create_api_router(AppState::new(memory_backend()), &ApiConfig::default())
}

/// `path?name=<json>` with the JSON percent-encoded.
pub fn with_json_param(path: &str, name: &str, value: &JsonValue) -> String {
    format!(
        "{}?{}={}",
        path,
        name,
        urlencoding::encode(&value.to_string())
    )
}

/// Send one request and decode the body as JSON (`Null` when empty).
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<&JsonValue>,
) -> (StatusCode, JsonValue) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let request = builder.body(body).expect("valid request");

    let response = app.clone().oneshot(request).await.expect("infallible router");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    let json = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            JsonValue::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, json)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, JsonValue) {
    send(app, Method::GET, uri, None).await
}

pub async fn post(app: &Router, uri: &str, body: &JsonValue) -> (StatusCode, JsonValue) {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn patch(app: &Router, uri: &str, body: &JsonValue) -> (StatusCode, JsonValue) {
    send(app, Method::PATCH, uri, Some(body)).await
}

pub async fn put(app: &Router, uri: &str, body: &JsonValue) -> (StatusCode, JsonValue) {
    send(app, Method::PUT, uri, Some(body)).await
}

pub async fn delete(app: &Router, uri: &str) -> (StatusCode, JsonValue) {
    send(app, Method::DELETE, uri, None).await
}

/// POST a body that must succeed and return the created record.
pub async fn create(app: &Router, collection: &str, body: &JsonValue) -> JsonValue {
    let (status, json) = post(app, collection, body).await;
    assert_eq!(status, StatusCode::OK, "create failed: {}", json);
    json
}
