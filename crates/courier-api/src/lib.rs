//! Courier API: HTTP host for the shipping message pipeline.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use axum::Router;

use crate::state::AppState;

/// Builds the application router over `state`, without transport layers.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/cargo", routes::cargo::router())
        .nest("/api/v1/handling-events", routes::handling_events::router())
        .with_state(state)
}
