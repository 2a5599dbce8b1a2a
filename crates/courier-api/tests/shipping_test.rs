//! Integration tests for the cargo and handling event endpoints.

mod common;

use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_book_then_get_cargo() {
    // Arrange
    let state = common::test_state();
    let cargo_id = Uuid::new_v4();

    // Act
    let (status, _) = common::post_json(
        common::build_test_app(&state),
        "/api/v1/cargo",
        &json!({ "cargo_id": cargo_id }),
    )
    .await;
    let (get_status, view) =
        common::get_json(common::build_test_app(&state), &format!("/api/v1/cargo/{cargo_id}"))
            .await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(get_status, StatusCode::OK);
    assert_eq!(view["cargo_id"], cargo_id.to_string());
    assert_eq!(view["handling_event_count"], 0);
    assert_eq!(view["version"], 1);
}

#[tokio::test]
async fn test_handling_event_cascades_to_cargo() {
    // Arrange
    let state = common::test_state();
    let (cargo_id, event_id) = (Uuid::new_v4(), Uuid::new_v4());
    common::post_json(
        common::build_test_app(&state),
        "/api/v1/cargo",
        &json!({ "cargo_id": cargo_id }),
    )
    .await;

    // Act
    let (status, accepted) = common::post_json(
        common::build_test_app(&state),
        "/api/v1/handling-events",
        &json!({ "event_id": event_id, "cargo_id": cargo_id }),
    )
    .await;
    let relayed = common::drain_relays(&state).await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["relayed"], 1);
    assert_eq!(relayed, 1);
    let (_, cargo) =
        common::get_json(common::build_test_app(&state), &format!("/api/v1/cargo/{cargo_id}"))
            .await;
    assert_eq!(cargo["handling_event_count"], 1);
    assert_eq!(cargo["version"], 2);
    let (_, handling_event) = common::get_json(
        common::build_test_app(&state),
        &format!("/api/v1/handling-events/{event_id}"),
    )
    .await;
    assert_eq!(handling_event["cargo_id"], cargo_id.to_string());
}

#[tokio::test]
async fn test_resubmitted_booking_is_acknowledged_as_duplicate() {
    // Arrange
    let state = common::test_state();
    let body = json!({ "cargo_id": Uuid::new_v4(), "message_id": Uuid::new_v4() });
    common::post_json(common::build_test_app(&state), "/api/v1/cargo", &body).await;

    // Act
    let (status, json) =
        common::post_json(common::build_test_app(&state), "/api/v1/cargo", &body).await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["duplicate"], true);
    assert!(json["event_ids"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_booking_an_existing_cargo_returns_409() {
    let state = common::test_state();
    let cargo_id = Uuid::new_v4();
    common::post_json(
        common::build_test_app(&state),
        "/api/v1/cargo",
        &json!({ "cargo_id": cargo_id }),
    )
    .await;

    let (status, json) = common::post_json(
        common::build_test_app(&state),
        "/api/v1/cargo",
        &json!({ "cargo_id": cargo_id }),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "aggregate_already_exists");
}

#[tokio::test]
async fn test_unknown_cargo_returns_404() {
    let state = common::test_state();

    let (status, json) = common::get_json(
        common::build_test_app(&state),
        &format!("/api/v1/cargo/{}", Uuid::new_v4()),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "aggregate_not_found");
}

#[tokio::test]
async fn test_cargo_lookup_by_a_handling_event_id_returns_404() {
    // Arrange
    let state = common::test_state();
    let event_id = Uuid::new_v4();
    common::post_json(
        common::build_test_app(&state),
        "/api/v1/handling-events",
        &json!({ "event_id": event_id, "cargo_id": Uuid::new_v4() }),
    )
    .await;

    // Act
    let (status, json) = common::get_json(
        common::build_test_app(&state),
        &format!("/api/v1/cargo/{event_id}"),
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "aggregate_not_found");
}
