//! Shared test mocks and utilities for the Courier message routing engine.

mod clock;
mod repository;

pub use clock::{FixedClock, fixed_now};
pub use repository::{
    ConflictingEventRepository, EmptyEventRepository, FailingEventRepository,
    RecordingEventRepository, stored_event,
};
