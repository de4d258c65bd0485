mod common;

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use urbix_carpool::{routes, utils::jwt::create_token, AppState};

use common::{future_date, test_state, user};

fn app(state: &AppState) -> Router {
    routes::create_router(state.clone())
}

fn token_for(state: &AppState, id: Uuid, email: &str) -> String {
    create_token(id, email, &state.config.jwt_secret, 1).unwrap()
}

async fn call(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let body = match body {
        Some(v) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };

    let mut request = builder.body(body).unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn new_ride(seats: i32) -> Value {
    json!({
        "departure": "Plateau Mont-Royal",
        "destination": "Old Port",
        "date": future_date(),
        "time": "08:30",
        "seatsAvailable": seats,
    })
}

#[tokio::test]
async fn health_is_public() {
    let (state, _) = test_state().await;
    let (status, body) = call(app(&state), Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn ride_routes_require_a_valid_token() {
    let (state, _) = test_state().await;

    let (status, body) = call(app(&state), Method::GET, "/api/rides", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "unauthorized");

    let (status, _) = call(
        app(&state),
        Method::GET,
        "/api/rides",
        Some("not.a.token"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let forged = create_token(Uuid::new_v4(), "x@urbix.test", "other-secret", 1).unwrap();
    let (status, _) = call(app(&state), Method::GET, "/api/rides", Some(&forged), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_login_and_me() {
    let (state, _) = test_state().await;

    let (status, body) = call(
        app(&state),
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "name": "Dana", "email": " Dana@Urbix.Test ", "password": "hunter22" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["email"], "dana@urbix.test");
    assert_eq!(body["preferences"]["maxWalkingTime"], 15);
    assert!(body["token"].as_str().is_some());

    let (status, body) = call(
        app(&state),
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "name": "Dana again", "email": "dana@urbix.test", "password": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "conflict");

    let (status, _) = call(
        app(&state),
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "dana@urbix.test", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(
        app(&state),
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "dana@urbix.test", "password": "hunter22" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = call(app(&state), Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["name"], "Dana");
}

#[tokio::test]
async fn preferences_can_be_read_and_patched() {
    let (state, _) = test_state().await;
    let id = user(&state, "Dana").await;
    let token = token_for(&state, id, "dana@urbix.test");

    let (status, body) = call(
        app(&state),
        Method::GET,
        "/api/users/me/preferences",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["budgetSensitivity"], 50);
    assert_eq!(body["preferredModes"]["carpool"], false);

    let (status, body) = call(
        app(&state),
        Method::PUT,
        "/api/users/me/preferences",
        Some(&token),
        Some(json!({ "maxWalkingTime": 30, "preferredModes": { "carpool": true } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["maxWalkingTime"], 30);
    assert_eq!(body["preferredModes"]["carpool"], true);
    assert_eq!(body["preferredModes"]["transit"], true);

    let (status, body) = call(
        app(&state),
        Method::PUT,
        "/api/users/me/preferences",
        Some(&token),
        Some(json!({ "budgetSensitivity": 101 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");
}

#[tokio::test]
async fn offer_list_and_request_over_http() {
    let (state, notifier) = test_state().await;
    let driver = user(&state, "Dana").await;
    let rider = user(&state, "Ben").await;
    let driver_token = token_for(&state, driver, "dana@urbix.test");
    let rider_token = token_for(&state, rider, "ben@urbix.test");

    let (status, created) = call(
        app(&state),
        Method::POST,
        "/api/rides",
        Some(&driver_token),
        Some(new_ride(2)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "OPEN");
    assert_eq!(created["seats_available"], 2);
    let ride_id = created["id"].as_str().unwrap().to_string();

    let (status, listed) = call(app(&state), Method::GET, "/api/rides", Some(&rider_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["creator"]["name"], "Dana");
    assert!(listed[0]["creator"].get("email").is_none());

    // An empty body asks for a single seat.
    let (status, booking) = call(
        app(&state),
        Method::POST,
        &format!("/api/rides/{}/request", ride_id),
        Some(&rider_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(booking["seats_requested"], 1);
    assert_eq!(booking["status"], "PENDING");
    assert_eq!(notifier.sent().len(), 1);

    let (status, body) = call(
        app(&state),
        Method::POST,
        &format!("/api/rides/{}/request", ride_id),
        Some(&driver_token),
        Some(json!({ "seatsRequested": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");

    let booking_id = booking["id"].as_str().unwrap();
    let (status, approved) = call(
        app(&state),
        Method::POST,
        &format!("/api/rides/requests/{}/approve", booking_id),
        Some(&driver_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["booking"]["status"], "ACCEPTED");
    assert_eq!(approved["ride"]["seats_available"], 1);

    let (status, body) = call(
        app(&state),
        Method::POST,
        &format!("/api/rides/requests/{}/approve", booking_id),
        Some(&driver_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "invalid_state");
}

#[tokio::test]
async fn strangers_cannot_edit_rides() {
    let (state, _) = test_state().await;
    let driver = user(&state, "Dana").await;
    let stranger = user(&state, "Mallory").await;
    let driver_token = token_for(&state, driver, "dana@urbix.test");
    let stranger_token = token_for(&state, stranger, "mallory@urbix.test");

    let (_, created) = call(
        app(&state),
        Method::POST,
        "/api/rides",
        Some(&driver_token),
        Some(new_ride(3)),
    )
    .await;
    let uri = format!("/api/rides/{}", created["id"].as_str().unwrap());

    let (status, body) = call(
        app(&state),
        Method::PUT,
        &uri,
        Some(&stranger_token),
        Some(json!({ "seatsAvailable": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "forbidden");

    let (status, body) = call(app(&state), Method::DELETE, &uri, Some(&driver_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], true);

    let (status, _) = call(app(&state), Method::DELETE, &uri, Some(&driver_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_input_is_a_validation_error() {
    let (state, _) = test_state().await;
    let driver = user(&state, "Dana").await;
    let token = token_for(&state, driver, "dana@urbix.test");

    let (status, body) = call(
        app(&state),
        Method::PUT,
        "/api/rides/not-a-uuid",
        Some(&token),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");

    let (status, _) = call(
        app(&state),
        Method::POST,
        "/api/rides",
        Some(&token),
        Some(json!({ "departure": "A", "destination": "B", "date": future_date(), "time": "08:30", "seatsAvailable": "many" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
