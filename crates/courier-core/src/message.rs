//! Message abstractions.
//!
//! A message is any plain value the pipeline moves between senders and
//! aggregates. The pipeline never inspects a message beyond its concrete
//! type, which is what routing rules and handler lookup key on.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Trait that all routable messages implement.
pub trait Message: Any + Send + Sync + fmt::Debug {
    /// The type name for this message (for logging/routing diagnostics).
    fn message_type(&self) -> &'static str;
}

/// Unique identifier of a single message delivery, assigned once by the
/// originator and carried unchanged through retries and redeliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub Uuid);

impl MessageId {
    /// Generates a fresh random message identifier.
    #[must_use]
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Derives a stable identifier from this one and a discriminator.
    ///
    /// The same inputs always yield the same identifier, which keeps
    /// identifiers of derived messages and events stable when a handling
    /// call is retried.
    #[must_use]
    pub fn derive(&self, discriminator: &str) -> Uuid {
        Uuid::new_v5(&self.0, discriminator.as_bytes())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Uuid> for MessageId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// A type-erased, immutable, cheaply cloneable message value.
#[derive(Clone)]
pub struct Payload {
    inner: Arc<dyn Any + Send + Sync>,
    type_id: TypeId,
    message_type: &'static str,
}

impl Payload {
    /// Wraps a concrete message.
    pub fn new<M: Message>(message: M) -> Self {
        let message_type = message.message_type();
        Self {
            inner: Arc::new(message),
            type_id: TypeId::of::<M>(),
            message_type,
        }
    }

    /// Returns the logical message type name.
    #[must_use]
    pub fn message_type(&self) -> &'static str {
        self.message_type
    }

    /// Returns the `TypeId` of the wrapped concrete message.
    #[must_use]
    pub fn message_type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns `true` if the wrapped message is an `M`.
    #[must_use]
    pub fn is<M: Message>(&self) -> bool {
        self.type_id == TypeId::of::<M>()
    }

    /// Borrows the wrapped message as an `M`, if it is one.
    #[must_use]
    pub fn downcast_ref<M: Message>(&self) -> Option<&M> {
        (*self.inner).downcast_ref::<M>()
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload")
            .field("message_type", &self.message_type)
            .finish_non_exhaustive()
    }
}
