//! Pipeline wiring for the shipping context.

use std::sync::Arc;

use courier_core::clock::Clock;
use courier_core::envelope::ProcessingRequirement;
use courier_core::repository::EventRepository;
use courier_messaging::{
    LocalQueue, MessageDispatcher, MessageService, MessagingError, ReceivingChain, Route,
    SendingChain, SendingStrategy,
};

use crate::domain::aggregates::{Cargo, HandlingEvent};
use crate::domain::messages::{BookCargo, RegisterHandlingEvent};

/// Sender id stamped on envelopes submitted by clients.
pub const CLIENT_SENDER_ID: &str = "client";

/// Receiving rules: bookings create cargo, registrations create handling
/// events, and relayed envelopes pass through unchanged.
#[must_use]
pub fn receiving_chain() -> ReceivingChain {
    ReceivingChain::new()
        .route(|m: &BookCargo| {
            Route::to::<Cargo>(m.cargo_id, m.message_id)
                .requiring(ProcessingRequirement::RequiresNew)
                .sent_by(CLIENT_SENDER_ID)
        })
        .route(|m: &RegisterHandlingEvent| {
            Route::to::<HandlingEvent>(m.event_id, m.message_id)
                .requiring(ProcessingRequirement::RequiresNew)
                .sent_by(CLIENT_SENDER_ID)
        })
        .accept_envelopes()
}

/// A dispatcher with every shipping aggregate registered.
///
/// # Errors
///
/// Returns a registration error if an aggregate declares conflicting
/// handlers.
pub fn dispatcher(
    repository: Arc<dyn EventRepository>,
    clock: Arc<dyn Clock>,
) -> Result<MessageDispatcher, MessagingError> {
    MessageDispatcher::new(repository, clock)
        .register::<Cargo>()?
        .register::<HandlingEvent>()
}

/// Sending rules: every outbound send is queued locally for re-entry.
#[must_use]
pub fn sending_chain(queue: Arc<LocalQueue>) -> SendingChain {
    SendingChain::new().otherwise(queue as Arc<dyn SendingStrategy>)
}

/// The complete shipping pipeline over `repository`, relaying through
/// `queue`.
///
/// # Errors
///
/// See [`dispatcher`].
pub fn message_service(
    repository: Arc<dyn EventRepository>,
    clock: Arc<dyn Clock>,
    queue: Arc<LocalQueue>,
) -> Result<MessageService, MessagingError> {
    Ok(MessageService::new(
        receiving_chain(),
        dispatcher(repository, clock)?,
        sending_chain(queue),
    ))
}
