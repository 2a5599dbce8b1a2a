//! Event store implementations for the Courier message routing engine.
//!
//! `InMemoryEventRepository` serves single-process hosting and tests;
//! `PgEventRepository` persists streams in `PostgreSQL`.

pub mod in_memory;
pub mod pg_event_repository;
