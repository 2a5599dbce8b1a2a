//! End-to-end shipping scenarios through the full message pipeline.

use std::sync::Arc;

use courier_core::error::DomainError;
use courier_core::message::{MessageId, Payload};
use courier_core::repository::EventRepository;
use courier_event_store::in_memory::InMemoryEventRepository;
use courier_messaging::{LocalQueue, MessageService, MessagingError, ProcessingStage};
use courier_shipping::application::query_handlers::{get_cargo_by_id, get_handling_event_by_id};
use courier_shipping::domain::messages::{BookCargo, RegisterHandlingEvent};
use courier_shipping::routing::message_service;
use courier_test_support::FixedClock;
use uuid::Uuid;

struct Shipping {
    service: MessageService,
    queue: Arc<LocalQueue>,
    repo: Arc<InMemoryEventRepository>,
}

fn shipping() -> Shipping {
    let repo = Arc::new(InMemoryEventRepository::new());
    let queue = Arc::new(LocalQueue::new());
    let service = message_service(
        Arc::clone(&repo) as Arc<dyn EventRepository>,
        Arc::new(FixedClock::default()),
        Arc::clone(&queue),
    )
    .unwrap();
    Shipping {
        service,
        queue,
        repo,
    }
}

fn book(cargo_id: Uuid) -> BookCargo {
    BookCargo {
        message_id: MessageId::new_random(),
        cargo_id,
    }
}

fn register(event_id: Uuid, cargo_id: Uuid) -> RegisterHandlingEvent {
    RegisterHandlingEvent {
        message_id: MessageId::new_random(),
        event_id,
        cargo_id,
    }
}

#[tokio::test]
async fn test_new_cargo_handling_event_is_registered() {
    // Arrange
    let s = shipping();
    let (cargo_id, first_event_id) = (Uuid::new_v4(), Uuid::new_v4());

    // Act
    s.service.process_message(book(cargo_id)).await.unwrap();
    let registered = s
        .service
        .process_message(register(first_event_id, cargo_id))
        .await
        .unwrap();
    let relayed = s.queue.try_dequeue().unwrap();
    s.service
        .process(Payload::new(relayed))
        .await
        .unwrap();

    // Assert
    assert_eq!(registered.relayed, 1);
    assert!(s.queue.is_empty());
    let cargo = get_cargo_by_id(cargo_id, s.repo.as_ref()).await.unwrap();
    assert_eq!(cargo.handling_event_count, 1);
    assert_eq!(cargo.version, 2);
    let handling_event = get_handling_event_by_id(first_event_id, s.repo.as_ref())
        .await
        .unwrap();
    assert_eq!(handling_event.cargo_id, Some(cargo_id));
}

#[tokio::test]
async fn test_handling_event_for_unbooked_cargo_surfaces_not_found() {
    // Arrange
    let s = shipping();
    let (cargo_id, event_id) = (Uuid::new_v4(), Uuid::new_v4());
    s.service
        .process_message(register(event_id, cargo_id))
        .await
        .unwrap();

    // Act
    let failure = s.service.drain(&s.queue).await.unwrap_err();

    // Assert
    assert_eq!(failure.stage, ProcessingStage::Resolving);
    match failure.error {
        MessagingError::AggregateNotFound {
            aggregate_type,
            aggregate_id,
        } => {
            assert_eq!(aggregate_type, "cargo");
            assert_eq!(aggregate_id, cargo_id);
        }
        other => panic!("expected AggregateNotFound, got {other:?}"),
    }
    assert!(s.repo.load_events("cargo", cargo_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_redelivered_notification_counts_once() {
    // Arrange
    let s = shipping();
    let (cargo_id, event_id) = (Uuid::new_v4(), Uuid::new_v4());
    s.service.process_message(book(cargo_id)).await.unwrap();
    s.service
        .process_message(register(event_id, cargo_id))
        .await
        .unwrap();
    let notification = s.queue.try_dequeue().unwrap();

    // Act
    let first = s
        .service
        .process(Payload::new(notification.clone()))
        .await
        .unwrap();
    let second = s
        .service
        .process(Payload::new(notification))
        .await
        .unwrap();

    // Assert
    assert!(!first.duplicate);
    assert!(second.duplicate);
    let cargo = get_cargo_by_id(cargo_id, s.repo.as_ref()).await.unwrap();
    assert_eq!(cargo.handling_event_count, 1);
}

#[tokio::test]
async fn test_resubmitted_registration_requeues_the_same_notification() {
    // Arrange
    let s = shipping();
    let (cargo_id, event_id) = (Uuid::new_v4(), Uuid::new_v4());
    s.service.process_message(book(cargo_id)).await.unwrap();
    let registration = register(event_id, cargo_id);
    s.service
        .process_message(registration.clone())
        .await
        .unwrap();
    let original = s.queue.try_dequeue().unwrap();

    // Act
    let again = s.service.process_message(registration).await.unwrap();
    let requeued = s.queue.try_dequeue().unwrap();
    s.service.process(Payload::new(original)).await.unwrap();
    let replayed = s.service.process(Payload::new(requeued.clone())).await.unwrap();

    // Assert
    assert!(again.duplicate);
    assert_eq!(again.relayed, 1);
    assert!(replayed.duplicate);
    assert_eq!(replayed.message_id, requeued.message_id());
    let cargo = get_cargo_by_id(cargo_id, s.repo.as_ref()).await.unwrap();
    assert_eq!(cargo.handling_event_count, 1);
}

#[tokio::test]
async fn test_booking_an_existing_cargo_is_rejected() {
    // Arrange
    let s = shipping();
    let cargo_id = Uuid::new_v4();
    s.service.process_message(book(cargo_id)).await.unwrap();

    // Act
    let failure = s
        .service
        .process_message(book(cargo_id))
        .await
        .unwrap_err();

    // Assert
    assert_eq!(failure.stage, ProcessingStage::Resolving);
    assert!(matches!(
        failure.error,
        MessagingError::AggregateAlreadyExists { .. }
    ));
    let cargo = get_cargo_by_id(cargo_id, s.repo.as_ref()).await.unwrap();
    assert_eq!(cargo.version, 1);
}

#[tokio::test]
async fn test_several_handling_events_accumulate() {
    let s = shipping();
    let cargo_id = Uuid::new_v4();
    s.service.process_message(book(cargo_id)).await.unwrap();

    for _ in 0..3 {
        s.service
            .process_message(register(Uuid::new_v4(), cargo_id))
            .await
            .unwrap();
    }
    let reports = s.service.drain(&s.queue).await.unwrap();

    assert_eq!(reports.len(), 3);
    let cargo = get_cargo_by_id(cargo_id, s.repo.as_ref()).await.unwrap();
    assert_eq!(cargo.handling_event_count, 3);
    assert_eq!(cargo.version, 4);
}

#[tokio::test]
async fn test_notification_keeps_the_registration_correlation() {
    let s = shipping();
    let (cargo_id, event_id) = (Uuid::new_v4(), Uuid::new_v4());
    let registration = register(event_id, cargo_id);
    let correlation = registration.message_id.0;
    s.service.process_message(book(cargo_id)).await.unwrap();
    s.service.process_message(registration).await.unwrap();

    let notification = s.queue.try_dequeue().unwrap();

    assert_eq!(notification.correlation_id(), correlation);
    assert_eq!(notification.receiver_type(), "cargo");
    assert_eq!(notification.sender_id(), format!("handling_event/{event_id}"));
}

#[tokio::test]
async fn test_handling_event_sharing_an_unbooked_cargo_id_surfaces_not_found() {
    // Arrange
    let s = shipping();
    let shared_id = Uuid::new_v4();
    s.service
        .process_message(register(shared_id, shared_id))
        .await
        .unwrap();

    // Act
    let failure = s.service.drain(&s.queue).await.unwrap_err();

    // Assert
    assert_eq!(failure.stage, ProcessingStage::Resolving);
    assert!(matches!(
        failure.error,
        MessagingError::AggregateNotFound { ref aggregate_type, aggregate_id }
            if aggregate_type == "cargo" && aggregate_id == shared_id
    ));
    assert!(matches!(
        get_cargo_by_id(shared_id, s.repo.as_ref()).await,
        Err(DomainError::AggregateNotFound(id)) if id == shared_id
    ));
    let handling_event = get_handling_event_by_id(shared_id, s.repo.as_ref())
        .await
        .unwrap();
    assert_eq!(handling_event.cargo_id, Some(shared_id));
}

#[tokio::test]
async fn test_cargo_and_handling_event_with_the_same_id_are_independent() {
    // Arrange
    let s = shipping();
    let shared_id = Uuid::new_v4();
    s.service.process_message(book(shared_id)).await.unwrap();

    // Act
    s.service
        .process_message(register(shared_id, shared_id))
        .await
        .unwrap();
    s.service.drain(&s.queue).await.unwrap();

    // Assert
    let cargo = get_cargo_by_id(shared_id, s.repo.as_ref()).await.unwrap();
    assert_eq!(cargo.handling_event_count, 1);
    assert_eq!(cargo.version, 2);
    let handling_event = get_handling_event_by_id(shared_id, s.repo.as_ref())
        .await
        .unwrap();
    assert_eq!(handling_event.version, 1);
}
