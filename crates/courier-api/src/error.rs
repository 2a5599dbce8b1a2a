//! Courier API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use courier_core::error::DomainError;
use courier_messaging::{MessagingError, ProcessingFailure};
use serde::Serialize;
use thiserror::Error;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The message pipeline could not be assembled.
    #[error("pipeline error: {0}")]
    Pipeline(#[from] MessagingError),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer wrapper around query and pipeline failures that implements
/// `IntoResponse`.
#[derive(Debug)]
pub enum ApiError {
    /// A query or domain operation failed.
    Domain(DomainError),
    /// A submitted message failed somewhere in the pipeline.
    Processing(ProcessingFailure),
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self::Domain(err)
    }
}

impl From<ProcessingFailure> for ApiError {
    fn from(failure: ProcessingFailure) -> Self {
        Self::Processing(failure)
    }
}

fn classify_domain(err: &DomainError) -> (StatusCode, &'static str) {
    match err {
        DomainError::AggregateNotFound(_) => (StatusCode::NOT_FOUND, "aggregate_not_found"),
        DomainError::ConcurrencyConflict { .. } => (StatusCode::CONFLICT, "concurrency_conflict"),
        DomainError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
        DomainError::Infrastructure(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "infrastructure_error")
        }
    }
}

fn classify_messaging(err: &MessagingError) -> (StatusCode, &'static str) {
    match err {
        MessagingError::AggregateNotFound { .. } => {
            (StatusCode::NOT_FOUND, "aggregate_not_found")
        }
        MessagingError::AggregateAlreadyExists { .. } => {
            (StatusCode::CONFLICT, "aggregate_already_exists")
        }
        MessagingError::CommitConflict { .. } => (StatusCode::CONFLICT, "concurrency_conflict"),
        MessagingError::Domain(inner) => classify_domain(inner),
        MessagingError::UnroutableMessage { .. }
        | MessagingError::UnroutableOutboundMessage { .. }
        | MessagingError::NoHandlerForMessageType { .. }
        | MessagingError::AmbiguousHandler { .. }
        | MessagingError::UnknownAggregateType(_)
        | MessagingError::DuplicateAggregateType(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "routing_error")
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let ((status, error_code), message) = match &self {
            Self::Domain(err) => (classify_domain(err), err.to_string()),
            Self::Processing(failure) => (classify_messaging(&failure.error), failure.to_string()),
        };

        if status.is_server_error() {
            tracing::error!(error = error_code, %message, "request failed");
        }

        let body = ErrorBody {
            error: error_code,
            message,
        };

        (status, Json(body)).into_response()
    }
}
