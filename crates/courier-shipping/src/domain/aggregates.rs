//! Aggregate roots for the shipping context.

use courier_core::aggregate::AggregateRoot;
use courier_core::envelope::ProcessingRequirement;
use courier_core::error::DomainError;
use courier_core::event::{Event, EventKind};
use courier_messaging::{Handlers, HandlingContext, MessagingAggregate};
use tracing::debug;
use uuid::Uuid;

use super::events::{
    CargoBooked, CargoEvent, CargoEventKind, CargoHandled, HandlingEventEvent,
    HandlingEventKind, HandlingEventRegistered,
};
use super::messages::{BookCargo, CargoWasHandled, RegisterHandlingEvent};

/// The aggregate root for a cargo.
#[derive(Debug)]
pub struct Cargo {
    /// Aggregate identifier.
    pub id: Uuid,
    /// Current version (event count).
    pub(crate) version: i64,
    /// Whether the cargo has been booked.
    booked: bool,
    /// Number of handling events the cargo was notified about.
    handling_event_count: u32,
    /// Uncommitted events pending persistence.
    uncommitted_events: Vec<CargoEvent>,
}

impl Cargo {
    /// Returns `true` once the cargo has been booked.
    #[must_use]
    pub fn is_booked(&self) -> bool {
        self.booked
    }

    /// Number of handling events registered for this cargo.
    #[must_use]
    pub fn handling_event_count(&self) -> u32 {
        self.handling_event_count
    }

    fn raise(&mut self, kind: CargoEventKind, ctx: &HandlingContext) {
        let metadata = ctx.event_metadata(self.id, self.next_sequence_number(), kind.event_type());
        self.apply_change(Event { metadata, kind });
    }

    fn book(&mut self, message: &BookCargo, ctx: &mut HandlingContext) -> Result<(), DomainError> {
        if message.cargo_id != self.id {
            return Err(DomainError::Validation(format!(
                "booking for cargo {} addressed to aggregate {}",
                message.cargo_id, self.id
            )));
        }
        if self.booked {
            return Err(DomainError::Validation(format!(
                "cargo {} is already booked",
                self.id
            )));
        }
        self.raise(
            CargoEventKind::CargoBooked(CargoBooked {
                cargo_id: message.cargo_id,
            }),
            ctx,
        );
        Ok(())
    }

    fn handled(
        &mut self,
        message: &CargoWasHandled,
        ctx: &mut HandlingContext,
    ) -> Result<(), DomainError> {
        if !self.booked {
            return Err(DomainError::Validation(format!(
                "cargo {} has not been booked",
                self.id
            )));
        }
        self.raise(
            CargoEventKind::CargoHandled(CargoHandled {
                handling_event_id: message.handling_event_id,
            }),
            ctx,
        );
        debug!(
            cargo_id = %self.id,
            handling_events = self.handling_event_count,
            message_id = %ctx.message_id(),
            notified_by = ctx.sender_id(),
            "cargo handled"
        );
        Ok(())
    }
}

impl AggregateRoot for Cargo {
    type Event = CargoEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        match &event.kind {
            CargoEventKind::CargoBooked(_) => {
                self.booked = true;
            }
            CargoEventKind::CargoHandled(_) => {
                self.handling_event_count += 1;
            }
        }
        self.version += 1;
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    fn push_uncommitted(&mut self, event: Self::Event) {
        self.uncommitted_events.push(event);
    }

    fn clear_uncommitted_events(&mut self) {
        self.uncommitted_events.clear();
    }
}

impl MessagingAggregate for Cargo {
    const AGGREGATE_TYPE: &'static str = "cargo";

    fn new(id: Uuid) -> Self {
        Self {
            id,
            version: 0,
            booked: false,
            handling_event_count: 0,
            uncommitted_events: Vec::new(),
        }
    }

    fn handlers() -> Handlers<Self> {
        Handlers::new().on(Self::book).on(Self::handled)
    }
}

/// The aggregate root for a registered handling event.
#[derive(Debug)]
pub struct HandlingEvent {
    /// Aggregate identifier.
    pub id: Uuid,
    /// Current version (event count).
    pub(crate) version: i64,
    /// The handled cargo, once registered.
    cargo_id: Option<Uuid>,
    /// Uncommitted events pending persistence.
    uncommitted_events: Vec<HandlingEventEvent>,
}

impl HandlingEvent {
    /// The cargo this handling event belongs to.
    #[must_use]
    pub fn cargo_id(&self) -> Option<Uuid> {
        self.cargo_id
    }

    /// Registers the handling event, then notifies the cargo, which must
    /// already exist.
    fn register(
        &mut self,
        message: &RegisterHandlingEvent,
        ctx: &mut HandlingContext,
    ) -> Result<(), DomainError> {
        if message.event_id != self.id {
            return Err(DomainError::Validation(format!(
                "handling event {} addressed to aggregate {}",
                message.event_id, self.id
            )));
        }
        let kind = HandlingEventKind::HandlingEventRegistered(HandlingEventRegistered {
            event_id: message.event_id,
            cargo_id: message.cargo_id,
        });
        let metadata = ctx.event_metadata(self.id, self.next_sequence_number(), kind.event_type());
        self.apply_change(Event { metadata, kind });

        let cargo_id = self.cargo_id.ok_or_else(|| {
            DomainError::Infrastructure(format!(
                "handling event {} registered without a cargo",
                self.id
            ))
        })?;
        ctx.to::<Cargo>(cargo_id)
            .ensuring(ProcessingRequirement::RequiresExisting)
            .send(CargoWasHandled {
                handling_event_id: self.id,
            });
        Ok(())
    }
}

impl AggregateRoot for HandlingEvent {
    type Event = HandlingEventEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        match &event.kind {
            HandlingEventKind::HandlingEventRegistered(payload) => {
                self.cargo_id = Some(payload.cargo_id);
            }
        }
        self.version += 1;
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    fn push_uncommitted(&mut self, event: Self::Event) {
        self.uncommitted_events.push(event);
    }

    fn clear_uncommitted_events(&mut self) {
        self.uncommitted_events.clear();
    }
}

impl MessagingAggregate for HandlingEvent {
    const AGGREGATE_TYPE: &'static str = "handling_event";

    fn new(id: Uuid) -> Self {
        Self {
            id,
            version: 0,
            cargo_id: None,
            uncommitted_events: Vec::new(),
        }
    }

    fn handlers() -> Handlers<Self> {
        Handlers::new().on(Self::register)
    }
}
