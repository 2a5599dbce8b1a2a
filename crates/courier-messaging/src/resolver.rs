//! Aggregate resolution: lock, load, rehydrate and requirement checks.

use std::sync::Arc;

use courier_core::envelope::ProcessingRequirement;
use courier_core::error::DomainError;
use courier_core::event::DomainEvent;
use courier_core::message::MessageId;
use courier_core::repository::{EventRepository, StoredEvent};
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use crate::aggregate::MessagingAggregate;
use crate::error::MessagingError;
use crate::locks::AggregateLocks;

/// Rebuilds an aggregate by applying its recorded history in order.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if a stored event cannot be decoded.
pub fn rehydrate<A: MessagingAggregate>(
    aggregate_id: Uuid,
    history: &[StoredEvent],
) -> Result<A, DomainError> {
    let mut aggregate = A::new(aggregate_id);
    for stored in history {
        let event = <A::Event as DomainEvent>::from_stored(stored)?;
        aggregate.apply(&event);
    }
    Ok(aggregate)
}

/// Loads aggregates for exclusive handling.
#[derive(Clone)]
pub struct AggregateResolver {
    repository: Arc<dyn EventRepository>,
    locks: Arc<AggregateLocks>,
}

impl AggregateResolver {
    /// Creates a resolver over `repository`.
    #[must_use]
    pub fn new(repository: Arc<dyn EventRepository>) -> Self {
        Self {
            repository,
            locks: Arc::new(AggregateLocks::new()),
        }
    }

    /// The backing event store.
    #[must_use]
    pub fn repository(&self) -> &Arc<dyn EventRepository> {
        &self.repository
    }

    /// Locks `A::AGGREGATE_TYPE/aggregate_id` and rehydrates it without
    /// checking any requirement. Only the stream of that aggregate type is
    /// read; another kind's stream under the same id is never consulted.
    ///
    /// # Errors
    ///
    /// Returns an error if the history cannot be loaded or decoded.
    pub async fn load<A: MessagingAggregate>(
        &self,
        aggregate_id: Uuid,
    ) -> Result<UnitOfWork<A>, MessagingError> {
        let guard = self.locks.acquire(A::AGGREGATE_TYPE, aggregate_id).await;
        let history = self
            .repository
            .load_events(A::AGGREGATE_TYPE, aggregate_id)
            .await?;
        let aggregate = rehydrate::<A>(aggregate_id, &history)?;

        Ok(UnitOfWork {
            aggregate,
            repository: Arc::clone(&self.repository),
            loaded_version: history.last().map_or(0, |e| e.sequence_number),
            history,
            _guard: guard,
        })
    }

    /// Locks, rehydrates and checks `requirement` against the history.
    ///
    /// # Errors
    ///
    /// Returns `AggregateAlreadyExists` or `AggregateNotFound` when the
    /// requirement does not hold, or an error from [`load`](Self::load).
    pub async fn resolve<A: MessagingAggregate>(
        &self,
        aggregate_id: Uuid,
        requirement: ProcessingRequirement,
    ) -> Result<UnitOfWork<A>, MessagingError> {
        let unit = self.load::<A>(aggregate_id).await?;
        unit.ensure(requirement)?;
        Ok(unit)
    }
}

/// One locked, rehydrated aggregate instance for a single handling call.
///
/// The aggregate stays locked until the unit is committed or dropped.
/// Dropping without commit discards every change made to the instance.
pub struct UnitOfWork<A> {
    aggregate: A,
    repository: Arc<dyn EventRepository>,
    loaded_version: i64,
    history: Vec<StoredEvent>,
    _guard: OwnedMutexGuard<()>,
}

impl<A: MessagingAggregate> UnitOfWork<A> {
    /// The rehydrated aggregate.
    pub fn aggregate(&self) -> &A {
        &self.aggregate
    }

    /// Mutable access for the handler.
    pub fn aggregate_mut(&mut self) -> &mut A {
        &mut self.aggregate
    }

    /// Version of the last recorded event at load time (0 if none).
    pub fn loaded_version(&self) -> i64 {
        self.loaded_version
    }

    /// Returns `true` if the aggregate had recorded history when loaded.
    pub fn exists(&self) -> bool {
        self.loaded_version > 0
    }

    /// Returns `true` if some recorded event was caused by `message_id`.
    pub fn has_processed(&self, message_id: MessageId) -> bool {
        self.history
            .iter()
            .any(|event| event.causation_id == message_id.0)
    }

    /// Rebuilds the aggregate as it stood just before `message_id` was
    /// handled: the history up to, not including, the first event it caused.
    /// Without such an event this is the current state.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if a stored event cannot be
    /// decoded.
    pub fn state_before(&self, message_id: MessageId) -> Result<A, DomainError> {
        let cut = self
            .history
            .iter()
            .position(|event| event.causation_id == message_id.0)
            .unwrap_or(self.history.len());
        rehydrate(self.aggregate.aggregate_id(), &self.history[..cut])
    }

    /// Checks `requirement` against the loaded history.
    ///
    /// # Errors
    ///
    /// Returns `AggregateAlreadyExists` for `RequiresNew` on an aggregate with
    /// history and `AggregateNotFound` for `RequiresExisting` on one without.
    pub fn ensure(&self, requirement: ProcessingRequirement) -> Result<(), MessagingError> {
        let aggregate_id = self.aggregate.aggregate_id();
        match requirement {
            ProcessingRequirement::RequiresNew if self.exists() => {
                Err(MessagingError::AggregateAlreadyExists {
                    aggregate_type: A::AGGREGATE_TYPE.to_owned(),
                    aggregate_id,
                })
            }
            ProcessingRequirement::RequiresExisting if !self.exists() => {
                Err(MessagingError::AggregateNotFound {
                    aggregate_type: A::AGGREGATE_TYPE.to_owned(),
                    aggregate_id,
                })
            }
            _ => Ok(()),
        }
    }

    /// Persists the events raised since load, all or nothing, and releases
    /// the lock.
    ///
    /// # Errors
    ///
    /// Returns `CommitConflict` if another writer appended first, or the
    /// store's error if the append fails.
    pub async fn commit(mut self) -> Result<Vec<StoredEvent>, MessagingError> {
        let stored = self
            .aggregate
            .uncommitted_events()
            .iter()
            .map(|event| event.to_stored(A::AGGREGATE_TYPE))
            .collect::<Result<Vec<_>, _>>()?;
        if stored.is_empty() {
            return Ok(stored);
        }

        self.repository
            .append_events(
                A::AGGREGATE_TYPE,
                self.aggregate.aggregate_id(),
                self.loaded_version,
                &stored,
            )
            .await?;
        self.aggregate.clear_uncommitted_events();
        Ok(stored)
    }
}
