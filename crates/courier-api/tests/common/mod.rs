//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use courier_event_store::in_memory::InMemoryEventRepository;
use courier_test_support::FixedClock;
use http_body_util::BodyExt;
use tower::ServiceExt;

use courier_api::state::AppState;

/// Application state over a fresh in-memory event store and a fixed clock.
pub fn test_state() -> AppState {
    AppState::new(
        Arc::new(InMemoryEventRepository::new()),
        Arc::new(FixedClock::default()),
    )
    .unwrap()
}

/// Build the full app router over `state`. Uses the same route structure as
/// `main.rs`. No relay workers run; tests drain `state.queue` explicitly.
pub fn build_test_app(state: &AppState) -> Router {
    courier_api::router(state.clone())
}

/// Process every relayed message currently queued.
pub async fn drain_relays(state: &AppState) -> usize {
    state.service.drain(&state.queue).await.unwrap().len()
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}
