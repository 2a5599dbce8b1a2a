//! Per-call handling context: event metadata and outbound sends.

use std::sync::Arc;

use courier_core::clock::Clock;
use courier_core::envelope::{Envelope, ProcessingRequirement};
use courier_core::event::EventMetadata;
use courier_core::message::{Message, MessageId, Payload};
use uuid::Uuid;

use crate::aggregate::MessagingAggregate;

/// A request, raised by a handler, to deliver a message to another
/// aggregate once the handling call has committed.
#[derive(Debug, Clone)]
pub struct OutboundSend {
    /// Identifier of the new message.
    pub message_id: MessageId,
    /// Target aggregate kind.
    pub target_type: String,
    /// Target aggregate id.
    pub target_id: Uuid,
    /// Requirement the target must satisfy.
    pub requirement: ProcessingRequirement,
    /// The message to deliver.
    pub payload: Payload,
    /// `"<aggregate_type>/<aggregate_id>"` of the originating aggregate.
    pub sender_id: String,
    /// Correlation id inherited from the originating envelope.
    pub correlation_id: Uuid,
}

impl OutboundSend {
    /// Converts the request into a routable envelope.
    #[must_use]
    pub fn into_envelope(self) -> Envelope {
        Envelope::new(
            self.message_id,
            self.payload,
            self.target_type,
            self.target_id,
        )
        .with_requirement(self.requirement)
        .with_sender(self.sender_id)
        .with_correlation_id(self.correlation_id)
    }
}

/// Context handed to a handler for the duration of one handling call.
///
/// Handlers use it to stamp metadata on the events they raise and to request
/// outbound sends. Sends are only collected here; the dispatcher hands them
/// to the sending chain after the call's events are committed.
pub struct HandlingContext {
    message_id: MessageId,
    correlation_id: Uuid,
    sender_id: String,
    origin: String,
    clock: Arc<dyn Clock>,
    sends: Vec<OutboundSend>,
}

impl HandlingContext {
    /// Creates the context for handling `envelope`.
    #[must_use]
    pub fn new(envelope: &Envelope, clock: Arc<dyn Clock>) -> Self {
        Self {
            message_id: envelope.message_id(),
            correlation_id: envelope.correlation_id(),
            sender_id: envelope.sender_id().to_owned(),
            origin: format!("{}/{}", envelope.receiver_type(), envelope.receiver_id()),
            clock,
            sends: Vec::new(),
        }
    }

    /// Id of the message being handled.
    #[must_use]
    pub fn message_id(&self) -> MessageId {
        self.message_id
    }

    /// Correlation id of the causal chain.
    #[must_use]
    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    /// Sender of the message being handled.
    #[must_use]
    pub fn sender_id(&self) -> &str {
        &self.sender_id
    }

    /// Builds metadata for an event raised while handling this message.
    ///
    /// The event id is derived from the message id and sequence number, so a
    /// retried call raises events with the same ids.
    #[must_use]
    pub fn event_metadata(
        &self,
        aggregate_id: Uuid,
        sequence_number: i64,
        event_type: &str,
    ) -> EventMetadata {
        EventMetadata {
            event_id: self.message_id.derive(&format!("event-{sequence_number}")),
            event_type: event_type.to_owned(),
            aggregate_id,
            sequence_number,
            correlation_id: self.correlation_id,
            causation_id: self.message_id.0,
            occurred_at: self.clock.now(),
        }
    }

    /// Starts an outbound send to aggregate `A` with id `target_id`.
    pub fn to<A: MessagingAggregate>(&mut self, target_id: Uuid) -> SendBuilder<'_> {
        self.to_type(A::AGGREGATE_TYPE, target_id)
    }

    /// Starts an outbound send to an aggregate kind known only by name.
    pub fn to_type(&mut self, target_type: impl Into<String>, target_id: Uuid) -> SendBuilder<'_> {
        SendBuilder {
            ctx: self,
            target_type: target_type.into(),
            target_id,
            requirement: ProcessingRequirement::Any,
        }
    }

    /// Sends requested so far.
    #[must_use]
    pub fn sends(&self) -> &[OutboundSend] {
        &self.sends
    }

    pub(crate) fn into_sends(self) -> Vec<OutboundSend> {
        self.sends
    }
}

/// Fluent builder for one outbound send.
#[must_use = "nothing is sent until `send` is called"]
pub struct SendBuilder<'a> {
    ctx: &'a mut HandlingContext,
    target_type: String,
    target_id: Uuid,
    requirement: ProcessingRequirement,
}

impl SendBuilder<'_> {
    /// Sets the requirement the target must satisfy (default `Any`).
    pub fn ensuring(mut self, requirement: ProcessingRequirement) -> Self {
        self.requirement = requirement;
        self
    }

    /// Queues `message` for delivery after commit.
    pub fn send<M: Message>(self, message: M) {
        let ctx = self.ctx;
        let index = ctx.sends.len();
        let send = OutboundSend {
            message_id: MessageId(ctx.message_id.derive(&format!("send-{index}"))),
            target_type: self.target_type,
            target_id: self.target_id,
            requirement: self.requirement,
            payload: Payload::new(message),
            sender_id: ctx.origin.clone(),
            correlation_id: ctx.correlation_id,
        };
        ctx.sends.push(send);
    }
}
