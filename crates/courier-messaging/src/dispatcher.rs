//! Message dispatcher: resolve the target, run its handler, commit.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use courier_core::clock::Clock;
use courier_core::envelope::Envelope;
use courier_core::message::{MessageId, Payload};
use courier_core::repository::{EventRepository, StoredEvent};
use tracing::{debug, instrument, warn};

use crate::aggregate::MessagingAggregate;
use crate::context::{HandlingContext, OutboundSend};
use crate::error::{AtStage, MessagingError, ProcessingFailure, ProcessingStage};
use crate::handlers::{HandlerFn, HandlerTable};
use crate::resolver::{AggregateResolver, UnitOfWork};

/// Result of one successful handling call.
#[derive(Debug)]
pub struct DispatchOutcome {
    /// Id of the dispatched envelope.
    pub message_id: MessageId,
    /// Events persisted by this call.
    pub committed_events: Vec<StoredEvent>,
    /// Sends to relay. For a duplicate these are rebuilt from the state the
    /// first handling call saw, with the same deterministic ids.
    pub sends: Vec<OutboundSend>,
    /// `true` if the envelope had already been handled and was acknowledged
    /// without committing anything.
    pub duplicate: bool,
}

impl DispatchOutcome {
    fn acknowledged_duplicate(message_id: MessageId, sends: Vec<OutboundSend>) -> Self {
        Self {
            message_id,
            committed_events: Vec::new(),
            sends,
            duplicate: true,
        }
    }
}

/// One registered aggregate kind with its type parameter erased.
#[async_trait]
trait AggregateKind: Send + Sync {
    fn accepted(&self) -> Vec<&'static str>;

    async fn dispatch(
        &self,
        resolver: &AggregateResolver,
        clock: Arc<dyn Clock>,
        envelope: &Envelope,
    ) -> Result<DispatchOutcome, ProcessingFailure>;
}

struct Registered<A> {
    table: HandlerTable<A>,
}

#[async_trait]
impl<A: MessagingAggregate> AggregateKind for Registered<A> {
    fn accepted(&self) -> Vec<&'static str> {
        self.table.accepted()
    }

    async fn dispatch(
        &self,
        resolver: &AggregateResolver,
        clock: Arc<dyn Clock>,
        envelope: &Envelope,
    ) -> Result<DispatchOutcome, ProcessingFailure> {
        let message_id = envelope.message_id();
        let mut unit = resolver
            .load::<A>(envelope.receiver_id())
            .await
            .at(ProcessingStage::Resolving)?;

        if unit.has_processed(message_id) {
            warn!("message already handled, acknowledging duplicate");
            let sends = self
                .replay_sends(&unit, envelope, clock)
                .at(ProcessingStage::Handling)?;
            return Ok(DispatchOutcome::acknowledged_duplicate(message_id, sends));
        }
        unit.ensure(envelope.requirement())
            .at(ProcessingStage::Resolving)?;

        let payload = envelope.payload();
        let handler = self.handler_for(payload).at(ProcessingStage::Handling)?;

        debug!(version = unit.loaded_version(), "handling");
        let mut ctx = HandlingContext::new(envelope, clock);
        handler(unit.aggregate_mut(), payload, &mut ctx).at(ProcessingStage::Handling)?;

        let committed_events = unit.commit().await.at(ProcessingStage::Handling)?;
        debug!(events = committed_events.len(), "committed");

        Ok(DispatchOutcome {
            message_id,
            committed_events,
            sends: ctx.into_sends(),
            duplicate: false,
        })
    }
}

impl<A: MessagingAggregate> Registered<A> {
    fn handler_for(&self, payload: &Payload) -> Result<&HandlerFn<A>, MessagingError> {
        self.table
            .select(payload)
            .ok_or_else(|| MessagingError::NoHandlerForMessageType {
                aggregate_type: A::AGGREGATE_TYPE.to_owned(),
                message_type: payload.message_type(),
            })
    }

    /// Runs the handler again against the state the first call saw and keeps
    /// only its sends. Send ids derive from the message id, so receivers that
    /// already got them acknowledge the copies as duplicates.
    fn replay_sends(
        &self,
        unit: &UnitOfWork<A>,
        envelope: &Envelope,
        clock: Arc<dyn Clock>,
    ) -> Result<Vec<OutboundSend>, MessagingError> {
        let payload = envelope.payload();
        let handler = self.handler_for(payload)?;
        let mut earlier = unit.state_before(envelope.message_id())?;
        let mut ctx = HandlingContext::new(envelope, clock);
        handler(&mut earlier, payload, &mut ctx)?;
        let sends = ctx.into_sends();
        debug!(sends = sends.len(), "rebuilt sends of duplicate");
        Ok(sends)
    }
}

/// Routes envelopes to registered aggregate kinds.
///
/// A dispatcher owns the resolver, and with it the per-aggregate locks, so
/// every envelope for one event store must go through the same instance.
pub struct MessageDispatcher {
    resolver: AggregateResolver,
    clock: Arc<dyn Clock>,
    kinds: HashMap<&'static str, Box<dyn AggregateKind>>,
}

impl MessageDispatcher {
    /// Creates a dispatcher with no registered aggregate kinds.
    #[must_use]
    pub fn new(repository: Arc<dyn EventRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            resolver: AggregateResolver::new(repository),
            clock,
            kinds: HashMap::new(),
        }
    }

    /// Registers aggregate kind `A` and validates its handler declarations.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateAggregateType` if `A::AGGREGATE_TYPE` is already
    /// registered, or `AmbiguousHandler` if `A` declares two handlers for one
    /// message type.
    pub fn register<A: MessagingAggregate>(mut self) -> Result<Self, MessagingError> {
        if self.kinds.contains_key(A::AGGREGATE_TYPE) {
            return Err(MessagingError::DuplicateAggregateType(A::AGGREGATE_TYPE));
        }
        let table = HandlerTable::build(A::AGGREGATE_TYPE, A::handlers())?;
        debug!(
            aggregate_type = A::AGGREGATE_TYPE,
            accepts = ?table.accepted(),
            "registered aggregate type"
        );
        self.kinds
            .insert(A::AGGREGATE_TYPE, Box::new(Registered { table }));
        Ok(self)
    }

    /// Names of every registered aggregate kind, sorted.
    #[must_use]
    pub fn registered_types(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.kinds.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Rust type names of the messages `aggregate_type` handles, or `None`
    /// if the kind is not registered.
    #[must_use]
    pub fn accepted_messages(&self, aggregate_type: &str) -> Option<Vec<&'static str>> {
        self.kinds.get(aggregate_type).map(|kind| kind.accepted())
    }

    /// The resolver used for every dispatch.
    #[must_use]
    pub fn resolver(&self) -> &AggregateResolver {
        &self.resolver
    }

    /// Handles one envelope: resolve, select the handler, invoke it and
    /// commit. Returns the sends to relay.
    ///
    /// # Errors
    ///
    /// Returns a [`ProcessingFailure`] naming the stage that failed. Nothing
    /// is persisted and no sends are returned on failure.
    #[instrument(
        skip_all,
        fields(
            message_id = %envelope.message_id(),
            receiver_type = envelope.receiver_type(),
            receiver_id = %envelope.receiver_id(),
        )
    )]
    pub async fn dispatch(&self, envelope: &Envelope) -> Result<DispatchOutcome, ProcessingFailure> {
        let kind = self
            .kinds
            .get(envelope.receiver_type())
            .ok_or_else(|| MessagingError::UnknownAggregateType(envelope.receiver_type().to_owned()))
            .at(ProcessingStage::Routed)?;
        kind.dispatch(&self.resolver, Arc::clone(&self.clock), envelope)
            .await
    }
}

impl fmt::Debug for MessageDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageDispatcher")
            .field("registered_types", &self.registered_types())
            .finish_non_exhaustive()
    }
}
