//! Messaging error taxonomy.

use std::fmt;

use courier_core::error::DomainError;
use courier_core::message::MessageId;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised while routing, resolving, handling or relaying a message.
#[derive(Debug, Error)]
pub enum MessagingError {
    /// No receiving rule matched the candidate object.
    #[error("no receiving strategy matched message of type {message_type}")]
    UnroutableMessage {
        /// Logical type of the rejected candidate.
        message_type: &'static str,
    },

    /// No sending rule matched an outbound send request.
    #[error("no sending strategy matched outbound message {message_id} to {target_type}/{target_id}")]
    UnroutableOutboundMessage {
        /// Identifier of the outbound message.
        message_id: MessageId,
        /// Target aggregate kind.
        target_type: String,
        /// Target aggregate id.
        target_id: Uuid,
    },

    /// `RequiresNew` was requested for an aggregate that already has history.
    #[error("aggregate {aggregate_type}/{aggregate_id} already exists")]
    AggregateAlreadyExists {
        /// Aggregate kind.
        aggregate_type: String,
        /// Aggregate id.
        aggregate_id: Uuid,
    },

    /// `RequiresExisting` was requested for an aggregate with no history.
    #[error("aggregate {aggregate_type}/{aggregate_id} not found")]
    AggregateNotFound {
        /// Aggregate kind.
        aggregate_type: String,
        /// Aggregate id.
        aggregate_id: Uuid,
    },

    /// The aggregate declares no handler for the payload type.
    #[error("aggregate type {aggregate_type} has no handler for message type {message_type}")]
    NoHandlerForMessageType {
        /// Aggregate kind.
        aggregate_type: String,
        /// Logical type of the unhandled payload.
        message_type: &'static str,
    },

    /// The aggregate declares more than one handler for the same payload type.
    #[error(
        "aggregate type {aggregate_type} declares more than one handler for message type {message_type}"
    )]
    AmbiguousHandler {
        /// Aggregate kind.
        aggregate_type: &'static str,
        /// Rust type name of the doubly handled message.
        message_type: &'static str,
    },

    /// The envelope names an aggregate kind nobody registered.
    #[error("aggregate type {0} is not registered")]
    UnknownAggregateType(String),

    /// The same aggregate kind was registered twice.
    #[error("aggregate type {0} is registered more than once")]
    DuplicateAggregateType(&'static str),

    /// The event store saw a concurrent write while committing.
    #[error(
        "commit conflict on aggregate {aggregate_id}: expected version {expected}, found {actual}"
    )]
    CommitConflict {
        /// Aggregate id.
        aggregate_id: Uuid,
        /// Version the handling call was based on.
        expected: i64,
        /// Version found in the store.
        actual: i64,
    },

    /// A handler rejected the message or a collaborator failed.
    #[error(transparent)]
    Domain(DomainError),
}

impl MessagingError {
    /// Returns `true` if repeating the whole handling call from scratch is
    /// safe. Only commit conflicts qualify: nothing of the failed call was
    /// persisted and the next attempt rehydrates fresh state.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::CommitConflict { .. })
    }
}

impl From<DomainError> for MessagingError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual,
            } => Self::CommitConflict {
                aggregate_id,
                expected,
                actual,
            },
            other => Self::Domain(other),
        }
    }
}

/// Per-envelope processing states, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessingStage {
    /// The candidate object has been accepted for processing.
    Received,
    /// The candidate has been turned into an envelope.
    Routed,
    /// The target aggregate is being loaded and checked.
    Resolving,
    /// The aggregate's handler is running or its events are being committed.
    Handling,
    /// The handler's events are persisted.
    Committed,
    /// Outbound sends are being handed to the sending chain.
    Relaying,
    /// Processing finished.
    Done,
}

impl fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Received => "received",
            Self::Routed => "routed",
            Self::Resolving => "resolving",
            Self::Handling => "handling",
            Self::Committed => "committed",
            Self::Relaying => "relaying",
            Self::Done => "done",
        };
        f.write_str(label)
    }
}

/// Terminal failure of one envelope, tagged with the state it failed in.
#[derive(Debug, Error)]
#[error("message processing failed in state {stage}: {error}")]
pub struct ProcessingFailure {
    /// State the envelope was in when it failed.
    pub stage: ProcessingStage,
    /// The underlying cause.
    #[source]
    pub error: MessagingError,
}

impl ProcessingFailure {
    /// Creates a failure at `stage`.
    pub fn new(stage: ProcessingStage, error: impl Into<MessagingError>) -> Self {
        Self {
            stage,
            error: error.into(),
        }
    }
}

/// Attaches the current processing state to a failing result.
pub(crate) trait AtStage<T> {
    fn at(self, stage: ProcessingStage) -> Result<T, ProcessingFailure>;
}

impl<T, E: Into<MessagingError>> AtStage<T> for Result<T, E> {
    fn at(self, stage: ProcessingStage) -> Result<T, ProcessingFailure> {
        self.map_err(|e| ProcessingFailure::new(stage, e))
    }
}
