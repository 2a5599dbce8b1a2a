//! Courier Core: shared domain abstractions.
//!
//! This crate defines the fundamental traits and types that the messaging
//! pipeline and every aggregate-hosting crate depend on. It contains no
//! infrastructure code.

pub mod aggregate;
pub mod clock;
pub mod envelope;
pub mod error;
pub mod event;
pub mod message;
pub mod repository;
