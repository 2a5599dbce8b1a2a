//! Routes for handling event registration.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use courier_core::message::MessageId;
use courier_shipping::application::query_handlers::{self, HandlingEventView};
use courier_shipping::domain::messages::RegisterHandlingEvent;
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::routes::MessageAccepted;
use crate::state::AppState;

/// Request body for POST /.
#[derive(Debug, Deserialize)]
pub struct RegisterHandlingEventRequest {
    /// Id of the new handling event.
    pub event_id: Uuid,
    /// The handled cargo.
    pub cargo_id: Uuid,
    /// Client-chosen message id. Generated when absent.
    pub message_id: Option<Uuid>,
}

/// POST /
///
/// The cargo learns about the event asynchronously, through the relay
/// workers; the response reports how many notifications were queued.
#[instrument(skip(state, request), fields(event_id = %request.event_id, cargo_id = %request.cargo_id))]
async fn register_handling_event(
    State(state): State<AppState>,
    Json(request): Json<RegisterHandlingEventRequest>,
) -> Result<Json<MessageAccepted>, ApiError> {
    let message = RegisterHandlingEvent {
        message_id: request.message_id.map_or_else(MessageId::new_random, MessageId),
        event_id: request.event_id,
        cargo_id: request.cargo_id,
    };

    info!(message_id = %message.message_id, "submitting register_handling_event message");

    let report = state.service.process_message(message).await?;

    Ok(Json(report.into()))
}

/// GET /{id}
#[instrument(skip(state))]
async fn get_handling_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<HandlingEventView>, ApiError> {
    let view = query_handlers::get_handling_event_by_id(id, &*state.event_repository).await?;
    Ok(Json(view))
}

/// Returns the router for handling events.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(register_handling_event))
        .route("/{id}", get(get_handling_event))
}
