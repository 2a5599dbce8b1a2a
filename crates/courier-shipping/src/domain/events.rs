//! Domain events for the shipping context.

use courier_core::event::{Event, EventKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event type identifier for [`CargoBooked`].
pub const CARGO_BOOKED_EVENT_TYPE: &str = "shipping.cargo_booked";
/// Event type identifier for [`CargoHandled`].
pub const CARGO_HANDLED_EVENT_TYPE: &str = "shipping.cargo_handled";
/// Event type identifier for [`HandlingEventRegistered`].
pub const HANDLING_EVENT_REGISTERED_EVENT_TYPE: &str = "shipping.handling_event_registered";

/// Emitted when a cargo is booked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CargoBooked {
    /// The cargo identifier.
    pub cargo_id: Uuid,
}

/// Emitted when a cargo learns about one of its handling events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CargoHandled {
    /// The handling event identifier.
    pub handling_event_id: Uuid,
}

/// Event payload variants for the cargo aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CargoEventKind {
    /// The cargo has been booked.
    CargoBooked(CargoBooked),
    /// The cargo has been handled.
    CargoHandled(CargoHandled),
}

impl EventKind for CargoEventKind {
    fn event_type(&self) -> &'static str {
        match self {
            Self::CargoBooked(_) => CARGO_BOOKED_EVENT_TYPE,
            Self::CargoHandled(_) => CARGO_HANDLED_EVENT_TYPE,
        }
    }
}

/// Domain event for the cargo aggregate.
pub type CargoEvent = Event<CargoEventKind>;

/// Emitted when a handling event is registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlingEventRegistered {
    /// The handling event identifier.
    pub event_id: Uuid,
    /// The handled cargo.
    pub cargo_id: Uuid,
}

/// Event payload variants for the handling event aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandlingEventKind {
    /// The handling event has been registered.
    HandlingEventRegistered(HandlingEventRegistered),
}

impl EventKind for HandlingEventKind {
    fn event_type(&self) -> &'static str {
        match self {
            Self::HandlingEventRegistered(_) => HANDLING_EVENT_REGISTERED_EVENT_TYPE,
        }
    }
}

/// Domain event for the handling event aggregate.
pub type HandlingEventEvent = Event<HandlingEventKind>;
