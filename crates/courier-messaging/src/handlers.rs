//! Capability registry: which handler an aggregate runs for which message
//! type.

use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::collections::hash_map::Entry;

use courier_core::error::DomainError;
use courier_core::message::{Message, Payload};

use crate::context::HandlingContext;
use crate::error::MessagingError;

/// Type-erased handler stored in the registry.
pub(crate) type HandlerFn<A> =
    dyn Fn(&mut A, &Payload, &mut HandlingContext) -> Result<(), DomainError> + Send + Sync;

struct HandlerEntry<A> {
    type_id: TypeId,
    message_type: &'static str,
    handler: Box<HandlerFn<A>>,
}

/// Ordered declaration of an aggregate's message handlers.
///
/// Built once per aggregate type by
/// [`MessagingAggregate::handlers`](crate::MessagingAggregate::handlers) and
/// validated when the aggregate is registered with the dispatcher.
pub struct Handlers<A> {
    entries: Vec<HandlerEntry<A>>,
}

impl<A: 'static> Handlers<A> {
    /// Creates an empty declaration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Declares `handler` as the handler for messages of type `M`.
    #[must_use]
    pub fn on<M, F>(mut self, handler: F) -> Self
    where
        M: Message,
        F: Fn(&mut A, &M, &mut HandlingContext) -> Result<(), DomainError> + Send + Sync + 'static,
    {
        let message_type = type_name::<M>();
        self.entries.push(HandlerEntry {
            type_id: TypeId::of::<M>(),
            message_type,
            handler: Box::new(
                move |aggregate: &mut A, payload: &Payload, ctx: &mut HandlingContext| {
                    let message = payload.downcast_ref::<M>().ok_or_else(|| {
                        DomainError::Infrastructure(format!(
                            "payload {} is not a {message_type}",
                            payload.message_type()
                        ))
                    })?;
                    handler(aggregate, message, ctx)
                },
            ),
        });
        self
    }
}

impl<A: 'static> Default for Handlers<A> {
    fn default() -> Self {
        Self::new()
    }
}

/// Validated lookup table from payload type to handler.
pub(crate) struct HandlerTable<A> {
    by_type: HashMap<TypeId, HandlerEntry<A>>,
}

impl<A> HandlerTable<A> {
    /// Builds the table, rejecting any payload type declared twice.
    pub(crate) fn build(
        aggregate_type: &'static str,
        handlers: Handlers<A>,
    ) -> Result<Self, MessagingError> {
        let mut by_type = HashMap::with_capacity(handlers.entries.len());
        for entry in handlers.entries {
            match by_type.entry(entry.type_id) {
                Entry::Occupied(_) => {
                    return Err(MessagingError::AmbiguousHandler {
                        aggregate_type,
                        message_type: entry.message_type,
                    });
                }
                Entry::Vacant(slot) => {
                    slot.insert(entry);
                }
            }
        }
        Ok(Self { by_type })
    }

    /// Returns the handler whose capability matches the payload's type.
    pub(crate) fn select(&self, payload: &Payload) -> Option<&HandlerFn<A>> {
        self.by_type
            .get(&payload.message_type_id())
            .map(|entry| entry.handler.as_ref())
    }

    /// Rust type names of every accepted message, sorted.
    pub(crate) fn accepted(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.by_type.values().map(|e| e.message_type).collect();
        names.sort_unstable();
        names
    }
}
