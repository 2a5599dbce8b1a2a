//! Messages, events and aggregates of the shipping domain.

pub mod aggregates;
pub mod events;
pub mod messages;
