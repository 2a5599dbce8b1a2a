//! Messages accepted by the shipping aggregates.

use courier_core::message::{Message, MessageId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Books a new cargo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookCargo {
    /// Delivery identifier chosen by the client.
    pub message_id: MessageId,
    /// The cargo to book.
    pub cargo_id: Uuid,
}

impl Message for BookCargo {
    fn message_type(&self) -> &'static str {
        "shipping.book_cargo"
    }
}

/// Registers a handling event for a cargo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterHandlingEvent {
    /// Delivery identifier chosen by the client.
    pub message_id: MessageId,
    /// The handling event to register.
    pub event_id: Uuid,
    /// The handled cargo.
    pub cargo_id: Uuid,
}

impl Message for RegisterHandlingEvent {
    fn message_type(&self) -> &'static str {
        "shipping.register_handling_event"
    }
}

/// Tells a cargo that one of its handling events was registered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CargoWasHandled {
    /// The registered handling event.
    pub handling_event_id: Uuid,
}

impl Message for CargoWasHandled {
    fn message_type(&self) -> &'static str {
        "shipping.cargo_was_handled"
    }
}
