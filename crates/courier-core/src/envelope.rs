//! The canonical routed unit.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::{Message, MessageId, Payload};

/// Existence requirement the target aggregate must satisfy before a message
/// is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingRequirement {
    /// The target must not have any recorded history yet.
    RequiresNew,
    /// The target must already have recorded history.
    RequiresExisting,
    /// Load the target if it exists, otherwise start a fresh one.
    #[default]
    Any,
}

impl fmt::Display for ProcessingRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::RequiresNew => "requires_new",
            Self::RequiresExisting => "requires_existing",
            Self::Any => "any",
        };
        f.write_str(label)
    }
}

/// An addressed, requirement-annotated message.
///
/// Receiver type plus receiver id identify exactly one aggregate instance.
/// Fields are fixed once the envelope is built.
#[derive(Debug, Clone)]
pub struct Envelope {
    message_id: MessageId,
    payload: Payload,
    receiver_type: String,
    receiver_id: Uuid,
    requirement: ProcessingRequirement,
    sender_id: String,
    correlation_id: Uuid,
}

impl Envelope {
    /// Creates an envelope addressed to `receiver_type`/`receiver_id` with the
    /// `Any` requirement, an empty sender and a correlation id equal to the
    /// message id.
    pub fn new(
        message_id: MessageId,
        payload: Payload,
        receiver_type: impl Into<String>,
        receiver_id: Uuid,
    ) -> Self {
        Self {
            message_id,
            payload,
            receiver_type: receiver_type.into(),
            receiver_id,
            requirement: ProcessingRequirement::Any,
            sender_id: String::new(),
            correlation_id: message_id.0,
        }
    }

    /// Sets the processing requirement.
    #[must_use]
    pub fn with_requirement(mut self, requirement: ProcessingRequirement) -> Self {
        self.requirement = requirement;
        self
    }

    /// Sets the opaque sender identifier.
    #[must_use]
    pub fn with_sender(mut self, sender_id: impl Into<String>) -> Self {
        self.sender_id = sender_id.into();
        self
    }

    /// Sets the correlation id shared by every message of one causal chain.
    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    /// Returns the message identifier.
    #[must_use]
    pub fn message_id(&self) -> MessageId {
        self.message_id
    }

    /// Returns the carried message.
    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Returns the name of the target aggregate kind.
    #[must_use]
    pub fn receiver_type(&self) -> &str {
        &self.receiver_type
    }

    /// Returns the target aggregate id.
    #[must_use]
    pub fn receiver_id(&self) -> Uuid {
        self.receiver_id
    }

    /// Returns the processing requirement.
    #[must_use]
    pub fn requirement(&self) -> ProcessingRequirement {
        self.requirement
    }

    /// Returns the sender identifier.
    #[must_use]
    pub fn sender_id(&self) -> &str {
        &self.sender_id
    }

    /// Returns the correlation id.
    #[must_use]
    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

// Lets an already addressed envelope re-enter the pipeline as a candidate.
impl Message for Envelope {
    fn message_type(&self) -> &'static str {
        "courier.envelope"
    }
}
