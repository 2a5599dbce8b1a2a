//! Routes for cargo bookings and cargo queries.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use courier_core::message::MessageId;
use courier_shipping::application::query_handlers::{self, CargoView};
use courier_shipping::domain::messages::BookCargo;
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::routes::MessageAccepted;
use crate::state::AppState;

/// Request body for POST /.
#[derive(Debug, Deserialize)]
pub struct BookCargoRequest {
    /// The cargo to book.
    pub cargo_id: Uuid,
    /// Client-chosen message id; resubmitting it is acknowledged as a
    /// duplicate. Generated when absent.
    pub message_id: Option<Uuid>,
}

/// POST /
#[instrument(skip(state, request), fields(cargo_id = %request.cargo_id))]
async fn book_cargo(
    State(state): State<AppState>,
    Json(request): Json<BookCargoRequest>,
) -> Result<Json<MessageAccepted>, ApiError> {
    let message = BookCargo {
        message_id: request.message_id.map_or_else(MessageId::new_random, MessageId),
        cargo_id: request.cargo_id,
    };

    info!(message_id = %message.message_id, "submitting book_cargo message");

    let report = state.service.process_message(message).await?;

    Ok(Json(report.into()))
}

/// GET /{id}
#[instrument(skip(state))]
async fn get_cargo(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CargoView>, ApiError> {
    let view = query_handlers::get_cargo_by_id(id, &*state.event_repository).await?;
    Ok(Json(view))
}

/// Returns the router for cargo.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(book_cargo))
        .route("/{id}", get(get_cargo))
}
