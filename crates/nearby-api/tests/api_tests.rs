//! Integration tests for the HTTP surface, driven in-process.

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use nearby_api::{create_app, AppState};
use nearby_core::{EngineConfig, SessionContext};
use nearby_directory::InMemoryDirectory;
use nearby_engine::{InMemoryStore, RequestController};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn app() -> (Router, Arc<AppState>) {
    let config = EngineConfig {
        seed: Some(7),
        ..Default::default()
    };
    let controller = RequestController::new(
        SessionContext::new("user-1"),
        config,
        Arc::new(InMemoryStore::new()),
    )
    .unwrap();
    let directory = InMemoryDirectory::seeded().unwrap();
    let state = AppState::new(Arc::new(controller), Arc::new(directory)).unwrap();
    (create_app(state.clone()), state)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

// =============================================================================
// Health & Search
// =============================================================================

#[tokio::test]
async fn test_health() {
    let (app, _) = app();
    let (status, body) = send(&app, "GET", "/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_search_ranks_by_rating() {
    let (app, _) = app();
    let (status, body) = send(&app, "GET", "/v1/search?q=milk", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "product");
    assert_eq!(body["category"], "grocery");
    let names: Vec<&str> = body["providers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Quick Mart", "Fresh Foods", "Corner Store"]);
}

#[tokio::test]
async fn test_blank_search_is_rejected() {
    let (app, _) = app();
    let (status, body) = send(&app, "GET", "/v1/search?q=%20%20", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("VALIDATION/"));
}

#[tokio::test]
async fn test_search_history_newest_first() {
    let (app, _) = app();
    for q in ["milk", "bread", "plumber", "eggs", "cheese", "repair"] {
        send(&app, "GET", &format!("/v1/search?q={}", q), None).await;
    }

    let (status, body) = send(&app, "GET", "/v1/search/history", None).await;
    assert_eq!(status, StatusCode::OK);
    let queries: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["query"].as_str().unwrap())
        .collect();
    assert_eq!(queries, vec!["repair", "cheese", "eggs", "plumber", "bread"]);
    assert_eq!(body[0]["type"], "service");
}

// =============================================================================
// Request Lifecycle
// =============================================================================

#[tokio::test]
async fn test_no_request_yet() {
    let (app, _) = app();
    let (status, body) = send(&app, "GET", "/v1/requests/active", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_null());
}

#[tokio::test]
async fn test_create_request() {
    let (app, _) = app();
    let (status, body) = send(&app, "POST", "/v1/requests", Some(json!({ "query": "milk" }))).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "active");
    assert_eq!(body["query"], "milk");
    let providers = body["providers"].as_array().unwrap();
    assert_eq!(providers.len(), 3);
    assert!(providers.iter().all(|p| p["response"]["state"] == "unset"));

    let (_, active) = send(&app, "GET", "/v1/requests/active", None).await;
    assert_eq!(active["id"], body["id"]);
}

#[tokio::test]
async fn test_create_without_providers() {
    let (app, state) = app();
    let (status, body) = send(
        &app,
        "POST",
        "/v1/requests",
        Some(json!({ "query": "electrician" })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("electrician"));
    assert!(state.controller.observe().is_none());
}

#[tokio::test]
async fn test_cancel_without_request_conflicts() {
    let (app, _) = app();
    let (status, body) = send(&app, "DELETE", "/v1/requests/active", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "STATE/no active request");
}

#[tokio::test]
async fn test_cancel_request() {
    let (app, _) = app();
    send(&app, "POST", "/v1/requests", Some(json!({ "query": "plumber" }))).await;

    let (status, body) = send(&app, "DELETE", "/v1/requests/active", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");

    let (status, _) = send(&app, "DELETE", "/v1/requests/active", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_refresh_with_nothing_stored() {
    let (app, _) = app();
    let (status, body) = send(&app, "POST", "/v1/requests/active/refresh", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_null());
}

#[tokio::test(start_paused = true)]
async fn test_request_resolves_and_is_counted() {
    let (app, state) = app();
    send(&app, "POST", "/v1/requests", Some(json!({ "query": "bread" }))).await;

    tokio::time::sleep(state.controller.config().resolution_window() + Duration::from_secs(1)).await;

    let (_, active) = send(&app, "GET", "/v1/requests/active", None).await;
    assert_eq!(active["status"], "completed");

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let text = String::from_utf8(to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec())
        .unwrap();
    assert!(text.contains(r#"nearby_requests_total{event="created"} 1"#));
    assert!(text.contains(r#"nearby_requests_total{event="completed"} 1"#));
}

// =============================================================================
// Change Feed
// =============================================================================

#[tokio::test]
async fn test_events_stream_headers() {
    let (app, _) = app();
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/v1/events").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
}
