//! Courier Shipping: cargo booking and handling.
//!
//! A cargo is booked, handling events are registered against it, and every
//! registered handling event notifies its cargo through the message
//! pipeline so the cargo can count how often it was handled.

pub mod application;
pub mod domain;
pub mod routing;
