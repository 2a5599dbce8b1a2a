//! Read-side queries over the shipping aggregates.

pub mod query_handlers;
