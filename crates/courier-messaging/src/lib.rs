//! Courier Messaging: routing and dispatch of messages to event-sourced
//! aggregates.
//!
//! Processing one candidate object runs a fixed pipeline:
//!
//! 1. [`ReceivingChain`] turns the candidate into an addressed [`Envelope`].
//! 2. [`AggregateResolver`] locks, loads and rehydrates the target aggregate
//!    and enforces the envelope's processing requirement.
//! 3. [`MessageDispatcher`] invokes the aggregate's handler for the payload
//!    type and commits the events it raised.
//! 4. [`SendingChain`] relays the outbound sends the handler requested, which
//!    re-enter the pipeline as new envelopes.
//!
//! [`MessageService`] wires the four stages together.
//!
//! [`Envelope`]: courier_core::envelope::Envelope

pub mod aggregate;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod handlers;
mod locks;
pub mod receiving;
pub mod resolver;
pub mod sending;
pub mod service;
pub mod worker;

pub use aggregate::MessagingAggregate;
pub use context::{HandlingContext, OutboundSend, SendBuilder};
pub use dispatcher::{DispatchOutcome, MessageDispatcher};
pub use error::{MessagingError, ProcessingFailure, ProcessingStage};
pub use handlers::Handlers;
pub use receiving::{ReceivingChain, Route};
pub use resolver::{AggregateResolver, UnitOfWork, rehydrate};
pub use sending::{LocalQueue, SendingChain, SendingStrategy};
pub use service::{MessageService, ProcessReport};
pub use worker::spawn_relay_workers;
