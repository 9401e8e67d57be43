//! HTTP-level integration tests driving the router against the in-memory
//! store.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use trip_store::{FixedClock, MemoryTripStore, TripStore};
use wayfarer_server::config::Config;
use wayfarer_server::state::AppState;
use wayfarer_server::{create_app, create_state};

use chrono::{TimeZone, Utc};
use entities::NewUser;

fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "integration-test-secret-key".to_string(),
        jwt_expiration_hours: 24,
        active_window_days: 30,
        log_level: "warn".to_string(),
    }
}

fn test_state() -> Arc<AppState<MemoryTripStore>> {
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 4, 1, 12, 0, 0).unwrap(),
    ));
    create_state(test_config(), MemoryTripStore::with_clock(clock))
}

/// Seeds a user directly in the store and mints a token for them.
async fn seed_user(
    state: &Arc<AppState<MemoryTripStore>>,
    username: &str,
    first: &str,
    last: &str,
) -> (i64, String) {
    let user = state
        .store
        .create_user(NewUser {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            first_name: first.to_string(),
            last_name: last.to_string(),
            password_hash: auth::hash_password("travel-far").unwrap(),
        })
        .await
        .unwrap();
    let token = state
        .jwt_manager
        .generate_token(user.id, user.username.clone())
        .unwrap();
    (user.id, token)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    };
    (status, value)
}

fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}

#[tokio::test]
async fn health_check_is_public() {
    let app = create_app(test_state());
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".to_string()));
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = create_app(test_state());

    let (status, body) = send(&app, "GET", "/api/trips", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "unauthorized");

    let (status, _) = send(&app, "GET", "/api/notifications", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signup_login_and_me() {
    let state = test_state();
    let app = create_app(state);

    let (status, body) = send(
        &app,
        "POST",
        "/api/users/signup",
        None,
        Some(json!({
            "username": "amelie",
            "email": "amelie@example.com",
            "first_name": "Amelie",
            "last_name": "Poulain",
            "password": "montmartre"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["username"], "amelie");
    assert!(body.get("password_hash").is_none());

    // Same username again is rejected as a conflict on the 400 surface.
    let (status, body) = send(
        &app,
        "POST",
        "/api/users/signup",
        None,
        Some(json!({
            "username": "amelie",
            "email": "other@example.com",
            "first_name": "Someone",
            "last_name": "Else",
            "password": "whatever"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "conflict");

    // Missing fields fail validation.
    let (status, body) = send(
        &app,
        "POST",
        "/api/users/signup",
        None,
        Some(json!({ "username": "incomplete" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "validation_error");

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "username": "amelie", "password": "montmartre" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();
    assert_eq!(body["user"]["username"], "amelie");

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "username": "amelie", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "unauthorized");

    let (status, body) = send(&app, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "amelie@example.com");
}

#[tokio::test]
async fn trip_membership_flow() {
    let state = test_state();
    let (creator_id, creator_token) = seed_user(&state, "creator", "Ada", "Lovelace").await;
    let (friend_id, friend_token) = seed_user(&state, "friend", "Alan", "Turing").await;
    let (_, outsider_token) = seed_user(&state, "outsider", "Eve", "Snoop").await;
    let app = create_app(state);

    // Catalog a city first.
    let (status, city) = send(
        &app,
        "POST",
        "/api/cities",
        Some(&creator_token),
        Some(json!({ "name": "Paris", "country": "France" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let city_id = city["id"].as_i64().unwrap();

    // Create the trip.
    let (status, body) = send(
        &app,
        "POST",
        "/api/trips",
        Some(&creator_token),
        Some(json!({ "name": "Paris Trip", "city_id": city_id, "start_date": "2024-05-01" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let trip_id = body["id"].as_i64().unwrap();

    // Missing parameters are a validation error.
    let (status, body) = send(
        &app,
        "POST",
        "/api/trips",
        Some(&creator_token),
        Some(json!({ "name": "No city" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "validation_error");

    // The creator sees the trip; the member list excludes them.
    let uri = format!("/api/trips/{trip_id}");
    let (status, body) = send(&app, "GET", &uri, Some(&creator_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Paris Trip");
    assert_eq!(body["city"]["name"], "Paris");
    assert_eq!(body["users"].as_array().unwrap().len(), 0);

    // A non-member gets 401, an unknown trip 404.
    let (status, _) = send(&app, "GET", &uri, Some(&friend_token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, "GET", "/api/trips/999", Some(&creator_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // An outsider cannot add members.
    let add_uri = format!("/api/trips/{trip_id}/members/{friend_id}");
    let (status, _) = send(&app, "POST", &add_uri, Some(&outsider_token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The creator can; the friend is notified.
    let (status, _) = send(&app, "POST", &add_uri, Some(&creator_token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "GET", "/api/notifications", Some(&friend_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let notifications = body.as_array().unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0]["kind"], "trip");
    assert_eq!(notifications[0]["initiator_id"], creator_id);
    assert_eq!(
        notifications[0]["text"],
        "You are added to Paris trip by Ada Lovelace."
    );

    // Adding twice is the conflict-on-400 surface.
    let (status, body) = send(&app, "POST", &add_uri, Some(&creator_token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "conflict");

    // Rename and list.
    let (status, _) = send(
        &app,
        "PATCH",
        &uri,
        Some(&creator_token),
        Some(json!({ "name": "Spring in Paris" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "GET", "/api/trips", Some(&creator_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["name"], "Spring in Paris");

    // Common trips; asking about yourself is invalid.
    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/trips/common/{friend_id}"),
        Some(&creator_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/trips/common/{creator_id}"),
        Some(&creator_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "validation_error");

    // The creator leaves; the trip survives for the friend.
    let leave_uri = format!("/api/trips/{trip_id}/leave");
    let (status, _) = send(&app, "POST", &leave_uri, Some(&creator_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", &uri, Some(&friend_token), None).await;
    assert_eq!(status, StatusCode::OK);

    // The last member leaves; the trip is gone.
    let (status, _) = send(&app, "POST", &leave_uri, Some(&friend_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", &uri, Some(&friend_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn notification_read_flow() {
    let state = test_state();
    let (sender_id, sender_token) = seed_user(&state, "sender", "Ada", "Lovelace").await;
    let (receiver_id, receiver_token) = seed_user(&state, "receiver", "Alan", "Turing").await;

    let notification = state
        .store
        .create_notification(entities::NewNotification {
            initiator_id: sender_id,
            destined_id: receiver_id,
            text: "hello".to_string(),
            kind: entities::NotificationKind::Common,
        })
        .await
        .unwrap();
    let app = create_app(state);

    // Only the destined user may mark it read.
    let read_uri = format!("/api/notifications/{}/read", notification.id);
    let (status, _) = send(&app, "POST", &read_uri, Some(&sender_token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "POST", &read_uri, Some(&receiver_token), None).await;
    assert_eq!(status, StatusCode::OK);
    // Idempotent.
    let (status, _) = send(&app, "POST", &read_uri, Some(&receiver_token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        "POST",
        "/api/notifications/999/read",
        Some(&receiver_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Everything is already read, so read-all flips nothing.
    let (status, body) = send(
        &app,
        "POST",
        "/api/notifications/read-all",
        Some(&receiver_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["marked"], 0);
}

#[tokio::test]
async fn city_catalog_endpoints() {
    let state = test_state();
    let (_, token) = seed_user(&state, "viewer", "Ada", "Lovelace").await;
    let app = create_app(state);

    let (_, paris) = send(
        &app,
        "POST",
        "/api/cities",
        Some(&token),
        Some(json!({ "name": "Paris", "country": "France" })),
    )
    .await;
    let paris_id = paris["id"].as_i64().unwrap();
    send(
        &app,
        "POST",
        "/api/cities",
        Some(&token),
        Some(json!({ "name": "Porto", "country": "Portugal" })),
    )
    .await;

    // Prefix search.
    let (status, body) = send(&app, "GET", "/api/cities/search/pa", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["name"], "Paris");

    // Detail views record visits.
    let detail_uri = format!("/api/cities/{paris_id}");
    let (status, body) = send(&app, "GET", &detail_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["visit_count"], 1);
    assert_eq!(body["has_visited"], false);
    let (_, body) = send(&app, "GET", &detail_uri, Some(&token), None).await;
    assert_eq!(body["visit_count"], 2);

    let (status, _) = send(&app, "GET", "/api/cities/999", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Top cities reflect the recorded visits.
    let (status, body) = send(&app, "GET", "/api/cities", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["name"], "Paris");
    assert_eq!(body[0]["visit_count"], 2);

    // Facts round-trip.
    let facts_uri = format!("/api/cities/{paris_id}/facts");
    let (status, _) = send(
        &app,
        "POST",
        &facts_uri,
        Some(&token),
        Some(json!({ "title": "Population", "fact": "2.1 million" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = send(&app, "GET", &facts_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["title"], "Population");

    // The caller's visit history.
    let (status, body) = send(&app, "GET", "/api/cities/visits", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["name"], "Paris");
    assert_eq!(body[0]["visit_count"], 2);
}

#[tokio::test]
async fn analytics_counts_users() {
    let state = test_state();
    let (user_id, token) = seed_user(&state, "counted", "Ada", "Lovelace").await;
    state.store.mark_verified(user_id).await.unwrap();
    let app = create_app(state);

    // The authenticated request itself stamps last_active.
    let (status, body) = send(&app, "GET", "/api/analytics/users", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["active"], 1);
    assert_eq!(body["verified"], 1);
    assert_eq!(body["active_verified"], 1);
}
