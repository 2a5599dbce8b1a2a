//! Query handlers for the shipping context.
//!
//! This module contains query handlers that reconstitute aggregates
//! from stored events and return read-only view DTOs.

use courier_core::error::DomainError;
use courier_core::repository::EventRepository;
use courier_messaging::{MessagingAggregate, rehydrate};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::{Cargo, HandlingEvent};

/// Read-only view of a cargo aggregate.
#[derive(Debug, Serialize)]
pub struct CargoView {
    /// The cargo identifier.
    pub cargo_id: Uuid,
    /// Number of handling events registered for the cargo.
    pub handling_event_count: u32,
    /// Current version (event count).
    pub version: i64,
}

/// Read-only view of a handling event aggregate.
#[derive(Debug, Serialize)]
pub struct HandlingEventView {
    /// The handling event identifier.
    pub event_id: Uuid,
    /// The handled cargo.
    pub cargo_id: Option<Uuid>,
    /// Current version (event count).
    pub version: i64,
}

/// Retrieves a cargo by its aggregate ID.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if no events exist for the ID.
/// Returns `DomainError::Infrastructure` if event deserialization fails.
pub async fn get_cargo_by_id(
    cargo_id: Uuid,
    repo: &dyn EventRepository,
) -> Result<CargoView, DomainError> {
    let stored_events = repo.load_events(Cargo::AGGREGATE_TYPE, cargo_id).await?;
    if stored_events.is_empty() {
        return Err(DomainError::AggregateNotFound(cargo_id));
    }
    let cargo: Cargo = rehydrate(cargo_id, &stored_events)?;
    Ok(CargoView {
        cargo_id,
        handling_event_count: cargo.handling_event_count(),
        version: cargo.version,
    })
}

/// Retrieves a handling event by its aggregate ID.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if no events exist for the ID.
/// Returns `DomainError::Infrastructure` if event deserialization fails.
pub async fn get_handling_event_by_id(
    event_id: Uuid,
    repo: &dyn EventRepository,
) -> Result<HandlingEventView, DomainError> {
    let stored_events = repo
        .load_events(HandlingEvent::AGGREGATE_TYPE, event_id)
        .await?;
    if stored_events.is_empty() {
        return Err(DomainError::AggregateNotFound(event_id));
    }
    let handling_event: HandlingEvent = rehydrate(event_id, &stored_events)?;
    Ok(HandlingEventView {
        event_id,
        cargo_id: handling_event.cargo_id(),
        version: handling_event.version,
    })
}

#[cfg(test)]
mod tests {
    use courier_core::error::DomainError;
    use courier_test_support::{
        EmptyEventRepository, FailingEventRepository, RecordingEventRepository, stored_event,
    };
    use uuid::Uuid;

    use crate::application::query_handlers::{get_cargo_by_id, get_handling_event_by_id};
    use crate::domain::events::{
        CARGO_BOOKED_EVENT_TYPE, CARGO_HANDLED_EVENT_TYPE, CargoBooked, CargoEventKind,
        CargoHandled, HANDLING_EVENT_REGISTERED_EVENT_TYPE, HandlingEventKind,
        HandlingEventRegistered,
    };

    #[tokio::test]
    async fn test_get_cargo_by_id_returns_view_with_handling_count() {
        // Arrange
        let cargo_id = Uuid::new_v4();
        let handled = |seq| {
            stored_event(
                cargo_id,
                "cargo",
                seq,
                CARGO_HANDLED_EVENT_TYPE,
                serde_json::to_value(CargoEventKind::CargoHandled(CargoHandled {
                    handling_event_id: Uuid::new_v4(),
                }))
                .unwrap(),
            )
        };
        let events = vec![
            stored_event(
                cargo_id,
                "cargo",
                1,
                CARGO_BOOKED_EVENT_TYPE,
                serde_json::to_value(CargoEventKind::CargoBooked(CargoBooked { cargo_id }))
                    .unwrap(),
            ),
            handled(2),
            handled(3),
        ];
        let repo = RecordingEventRepository::new(events);

        // Act
        let view = get_cargo_by_id(cargo_id, &repo).await.unwrap();

        // Assert
        assert_eq!(view.cargo_id, cargo_id);
        assert_eq!(view.handling_event_count, 2);
        assert_eq!(view.version, 3);
    }

    #[tokio::test]
    async fn test_get_cargo_by_id_returns_not_found_when_no_events() {
        // Arrange
        let cargo_id = Uuid::new_v4();
        let repo = EmptyEventRepository;

        // Act
        let result = get_cargo_by_id(cargo_id, &repo).await;

        // Assert
        match result.unwrap_err() {
            DomainError::AggregateNotFound(id) => assert_eq!(id, cargo_id),
            other => panic!("expected AggregateNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_cargo_by_id_propagates_store_failure() {
        let result = get_cargo_by_id(Uuid::new_v4(), &FailingEventRepository).await;

        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
    }

    #[tokio::test]
    async fn test_get_handling_event_by_id_returns_cargo_reference() {
        let (event_id, cargo_id) = (Uuid::new_v4(), Uuid::new_v4());
        let repo = RecordingEventRepository::new(vec![stored_event(
            event_id,
            "handling_event",
            1,
            HANDLING_EVENT_REGISTERED_EVENT_TYPE,
            serde_json::to_value(HandlingEventKind::HandlingEventRegistered(
                HandlingEventRegistered { event_id, cargo_id },
            ))
            .unwrap(),
        )]);

        let view = get_handling_event_by_id(event_id, &repo).await.unwrap();

        assert_eq!(view.event_id, event_id);
        assert_eq!(view.cargo_id, Some(cargo_id));
        assert_eq!(view.version, 1);
    }
}
