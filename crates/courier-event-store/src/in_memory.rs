//! In-memory implementation of the `EventRepository` trait.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use uuid::Uuid;

use courier_core::error::DomainError;
use courier_core::repository::{EventRepository, StoredEvent};

/// Process-local event store keyed by aggregate type and id.
///
/// Appends are checked against the stream's current version and applied as a
/// whole under one lock, so a rejected append leaves the stream untouched.
#[derive(Debug, Default)]
pub struct InMemoryEventRepository {
    streams: Mutex<HashMap<(String, Uuid), Vec<StoredEvent>>>,
}

impl InMemoryEventRepository {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of events across all streams.
    pub fn event_count(&self) -> usize {
        self.streams
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(Vec::len)
            .sum()
    }
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn load_events(
        &self,
        aggregate_type: &str,
        aggregate_id: Uuid,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        let streams = self.streams.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(streams
            .get(&(aggregate_type.to_owned(), aggregate_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn append_events(
        &self,
        aggregate_type: &str,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        let mut streams = self.streams.lock().unwrap_or_else(PoisonError::into_inner);
        let stream = streams
            .entry((aggregate_type.to_owned(), aggregate_id))
            .or_default();

        #[allow(clippy::cast_possible_wrap)]
        let actual = stream.len() as i64;
        if actual != expected_version {
            tracing::debug!(
                aggregate_type,
                %aggregate_id,
                expected_version,
                actual,
                "rejecting append on stale version"
            );
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual,
            });
        }

        for (offset, event) in (1_i64..).zip(events) {
            if event.aggregate_id != aggregate_id
                || event.aggregate_type != aggregate_type
                || event.sequence_number != actual + offset
            {
                return Err(DomainError::Infrastructure(format!(
                    "event {} does not continue stream {aggregate_type}/{aggregate_id} at version {actual}",
                    event.event_id
                )));
            }
        }

        stream.extend_from_slice(events);
        Ok(())
    }
}
