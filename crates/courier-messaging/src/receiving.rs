//! Receiving chain: turns candidate objects into addressed envelopes.

use std::fmt;

use courier_core::envelope::{Envelope, ProcessingRequirement};
use courier_core::message::{Message, MessageId, Payload};
use uuid::Uuid;

use crate::aggregate::MessagingAggregate;
use crate::error::MessagingError;

type Predicate = Box<dyn Fn(&Payload) -> bool + Send + Sync>;
type Converter = Box<dyn Fn(&Payload) -> Result<Envelope, MessagingError> + Send + Sync>;

/// Addressing decided by a receiving rule for one message.
#[derive(Debug, Clone)]
#[must_use]
pub struct Route {
    message_id: MessageId,
    receiver_type: String,
    receiver_id: Uuid,
    requirement: ProcessingRequirement,
    sender_id: String,
    correlation_id: Option<Uuid>,
}

impl Route {
    /// Addresses aggregate `A` with id `receiver_id`.
    pub fn to<A: MessagingAggregate>(receiver_id: Uuid, message_id: MessageId) -> Self {
        Self::to_type(A::AGGREGATE_TYPE, receiver_id, message_id)
    }

    /// Addresses an aggregate kind by name.
    pub fn to_type(
        receiver_type: impl Into<String>,
        receiver_id: Uuid,
        message_id: MessageId,
    ) -> Self {
        Self {
            message_id,
            receiver_type: receiver_type.into(),
            receiver_id,
            requirement: ProcessingRequirement::Any,
            sender_id: String::new(),
            correlation_id: None,
        }
    }

    /// Sets the requirement the receiver must satisfy.
    pub fn requiring(mut self, requirement: ProcessingRequirement) -> Self {
        self.requirement = requirement;
        self
    }

    /// Sets the sender identifier.
    pub fn sent_by(mut self, sender_id: impl Into<String>) -> Self {
        self.sender_id = sender_id.into();
        self
    }

    /// Joins an existing causal chain.
    pub fn correlated_with(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    /// Builds the envelope carrying `payload`.
    pub fn into_envelope(self, payload: Payload) -> Envelope {
        let envelope = Envelope::new(self.message_id, payload, self.receiver_type, self.receiver_id)
            .with_requirement(self.requirement)
            .with_sender(self.sender_id);
        match self.correlation_id {
            Some(correlation_id) => envelope.with_correlation_id(correlation_id),
            None => envelope,
        }
    }
}

struct ReceivingRule {
    matches: Predicate,
    convert: Converter,
}

/// Ordered list of predicate/converter rules. The first rule whose predicate
/// accepts a candidate converts it; later rules are not consulted.
///
/// Rules must be pure: resolving the same candidate twice yields the same
/// envelope.
#[derive(Default)]
pub struct ReceivingChain {
    rules: Vec<ReceivingRule>,
}

impl ReceivingChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a rule.
    #[must_use]
    pub fn when<P, C>(mut self, matches: P, convert: C) -> Self
    where
        P: Fn(&Payload) -> bool + Send + Sync + 'static,
        C: Fn(&Payload) -> Result<Envelope, MessagingError> + Send + Sync + 'static,
    {
        self.rules.push(ReceivingRule {
            matches: Box::new(matches),
            convert: Box::new(convert),
        });
        self
    }

    /// Appends a rule matching messages of type `M`, addressed by `route`.
    #[must_use]
    pub fn route<M, F>(self, route: F) -> Self
    where
        M: Message,
        F: Fn(&M) -> Route + Send + Sync + 'static,
    {
        self.when(Payload::is::<M>, move |payload: &Payload| {
            let message = payload
                .downcast_ref::<M>()
                .ok_or(MessagingError::UnroutableMessage {
                    message_type: payload.message_type(),
                })?;
            Ok(route(message).into_envelope(payload.clone()))
        })
    }

    /// Appends a rule passing already addressed envelopes through unchanged.
    /// Envelopes produced by the sending chain re-enter the pipeline here.
    #[must_use]
    pub fn accept_envelopes(self) -> Self {
        self.when(Payload::is::<Envelope>, |payload: &Payload| {
            payload
                .downcast_ref::<Envelope>()
                .cloned()
                .ok_or(MessagingError::UnroutableMessage {
                    message_type: payload.message_type(),
                })
        })
    }

    /// Appends a catch-all rule.
    #[must_use]
    pub fn otherwise<C>(self, convert: C) -> Self
    where
        C: Fn(&Payload) -> Result<Envelope, MessagingError> + Send + Sync + 'static,
    {
        self.when(|_| true, convert)
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if the chain has no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Converts `candidate` with the first matching rule.
    ///
    /// # Errors
    ///
    /// Returns `UnroutableMessage` if no rule matches, or the converter's
    /// error.
    pub fn resolve(&self, candidate: &Payload) -> Result<Envelope, MessagingError> {
        let rule = self
            .rules
            .iter()
            .find(|rule| (rule.matches)(candidate))
            .ok_or(MessagingError::UnroutableMessage {
                message_type: candidate.message_type(),
            })?;
        (rule.convert)(candidate)
    }
}

impl fmt::Debug for ReceivingChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReceivingChain")
            .field("rules", &self.rules.len())
            .finish()
    }
}
