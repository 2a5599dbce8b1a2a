//! Per-aggregate mutual exclusion.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

/// Serializes handling calls per aggregate (type and id).
///
/// Calls on different aggregates never wait on each other. Entries are
/// dropped once no caller holds or waits on them.
#[derive(Debug, Default)]
pub(crate) struct AggregateLocks {
    slots: Mutex<HashMap<(&'static str, Uuid), Arc<AsyncMutex<()>>>>,
}

impl AggregateLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Waits until the caller holds exclusive access to
    /// `aggregate_type/aggregate_id`.
    pub(crate) async fn acquire(
        &self,
        aggregate_type: &'static str,
        aggregate_id: Uuid,
    ) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            // Slots held only by the map have no holder and no waiter.
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            Arc::clone(slots.entry((aggregate_type, aggregate_id)).or_default())
        };
        slot.lock_owned().await
    }

    /// Number of aggregates currently tracked.
    #[cfg(test)]
    pub(crate) fn tracked(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_second_caller_waits_for_first() {
        // Arrange
        let locks = Arc::new(AggregateLocks::new());
        let id = Uuid::new_v4();
        let guard = locks.acquire("tally", id).await;

        // Act
        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire("tally", id).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Assert
        assert!(!contender.is_finished());
        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn test_distinct_ids_do_not_block_each_other() {
        let locks = AggregateLocks::new();

        let _a = locks.acquire("tally", Uuid::new_v4()).await;
        let _b = tokio::time::timeout(Duration::from_secs(1), locks.acquire("tally", Uuid::new_v4()))
            .await
            .expect("distinct aggregate must not wait");

        assert_eq!(locks.tracked(), 2);
    }

    #[tokio::test]
    async fn test_released_slots_are_pruned() {
        let locks = AggregateLocks::new();

        for _ in 0..10 {
            let _guard = locks.acquire("tally", Uuid::new_v4()).await;
        }
        let _last = locks.acquire("tally", Uuid::new_v4()).await;

        assert_eq!(locks.tracked(), 1);
    }

    #[tokio::test]
    async fn test_same_id_of_another_type_does_not_block() {
        let locks = AggregateLocks::new();
        let id = Uuid::new_v4();

        let _cargo = locks.acquire("cargo", id).await;
        let _event = tokio::time::timeout(Duration::from_secs(1), locks.acquire("handling_event", id))
            .await
            .expect("another aggregate type must not wait");

        assert_eq!(locks.tracked(), 2);
    }
}
