//! Aggregate root abstraction.

use uuid::Uuid;

use crate::event::DomainEvent;

/// Trait for aggregate roots that reconstitute from event history.
///
/// State changes flow exclusively through [`apply`](AggregateRoot::apply).
/// Replay calls `apply` alone; live handling goes through
/// [`apply_change`](AggregateRoot::apply_change), which additionally queues
/// the event for commit.
pub trait AggregateRoot: Send + Sync {
    /// The event type this aggregate produces and consumes.
    type Event: DomainEvent + Clone;

    /// Returns the aggregate identifier.
    fn aggregate_id(&self) -> Uuid;

    /// Returns the current version (number of events applied, replayed and
    /// live).
    fn version(&self) -> i64;

    /// Apply an event to mutate internal state.
    fn apply(&mut self, event: &Self::Event);

    /// Returns uncommitted events produced by message handling.
    fn uncommitted_events(&self) -> &[Self::Event];

    /// Queues an event for the next commit.
    fn push_uncommitted(&mut self, event: Self::Event);

    /// Clears uncommitted events after persistence.
    fn clear_uncommitted_events(&mut self);

    /// Applies a newly raised event and queues it for commit.
    fn apply_change(&mut self, event: Self::Event) {
        self.apply(&event);
        self.push_uncommitted(event);
    }

    /// Returns the version the persisted stream had when this instance was
    /// loaded.
    #[allow(clippy::cast_possible_wrap)]
    fn committed_version(&self) -> i64 {
        self.version() - self.uncommitted_events().len() as i64
    }

    /// Returns the sequence number the next raised event must carry.
    fn next_sequence_number(&self) -> i64 {
        self.version() + 1
    }
}
