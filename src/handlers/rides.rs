use axum::{body::Bytes, extract::State, http::StatusCode, Extension, Json};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::handlers::{JsonBody, PathParam, QueryParams};
use crate::services::bookings::{self, RequestSeats};
use crate::services::rides::{self, CreateRide, RideFilter, UpdateRide};
use crate::services::views::{ApprovalOutcome, BookingView, CancelOutcome, RequestedRide, RideView};
use crate::utils::jwt::Claims;
use crate::AppState;

// ============ Ride Offers ============

/// List rides, optionally filtered by departure, destination and day
pub async fn list_rides(
    State(state): State<AppState>,
    QueryParams(filter): QueryParams<RideFilter>,
) -> AppResult<Json<Vec<RideView>>> {
    Ok(Json(rides::list(&state, filter).await?))
}

/// Offer a ride
pub async fn create_ride(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    JsonBody(payload): JsonBody<CreateRide>,
) -> AppResult<(StatusCode, Json<RideView>)> {
    let ride = rides::create(&state, claims.sub, payload).await?;
    Ok((StatusCode::CREATED, Json(ride)))
}

/// Edit an offered ride (owner)
pub async fn update_ride(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    PathParam(ride_id): PathParam<Uuid>,
    JsonBody(payload): JsonBody<UpdateRide>,
) -> AppResult<Json<RideView>> {
    Ok(Json(rides::update(&state, ride_id, claims.sub, payload).await?))
}

/// Delete an offered ride (owner)
pub async fn delete_ride(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    PathParam(ride_id): PathParam<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    rides::delete(&state, ride_id, claims.sub).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// Withdraw an offered ride but keep it listed (owner)
pub async fn cancel_ride(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    PathParam(ride_id): PathParam<Uuid>,
) -> AppResult<Json<RideView>> {
    Ok(Json(rides::cancel(&state, ride_id, claims.sub).await?))
}

/// Mark an offered ride as done (owner)
pub async fn complete_ride(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    PathParam(ride_id): PathParam<Uuid>,
) -> AppResult<Json<RideView>> {
    Ok(Json(rides::complete(&state, ride_id, claims.sub).await?))
}

/// Rides the caller offers
pub async fn my_offered_rides(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<RideView>>> {
    Ok(Json(rides::list_offered(&state, claims.sub).await?))
}

// ============ Seat Requests ============

/// Ask for seats on a ride
pub async fn request_ride(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    PathParam(ride_id): PathParam<Uuid>,
    body: Bytes,
) -> AppResult<(StatusCode, Json<BookingView>)> {
    // An empty body asks for a single seat.
    let payload: RequestSeats = if body.iter().all(u8::is_ascii_whitespace) {
        RequestSeats::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::Validation(format!("Invalid request body: {}", e)))?
    };
    let booking = bookings::request_seats(&state, ride_id, claims.sub, payload).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

/// Requests on one ride (owner)
pub async fn list_requests_for_ride(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    PathParam(ride_id): PathParam<Uuid>,
) -> AppResult<Json<Vec<BookingView>>> {
    Ok(Json(bookings::list_for_ride(&state, ride_id, claims.sub).await?))
}

pub async fn approve_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    PathParam(booking_id): PathParam<Uuid>,
) -> AppResult<Json<ApprovalOutcome>> {
    Ok(Json(bookings::approve(&state, booking_id, claims.sub).await?))
}

pub async fn reject_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    PathParam(booking_id): PathParam<Uuid>,
) -> AppResult<Json<BookingView>> {
    Ok(Json(bookings::reject(&state, booking_id, claims.sub).await?))
}

/// Withdraw the caller's own request
pub async fn cancel_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    PathParam(booking_id): PathParam<Uuid>,
) -> AppResult<Json<CancelOutcome>> {
    Ok(Json(bookings::cancel(&state, booking_id, claims.sub).await?))
}

/// The caller's requests
pub async fn my_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<BookingView>>> {
    Ok(Json(bookings::list_mine(&state, claims.sub).await?))
}

/// The caller's requests with their rides
pub async fn my_requested_rides(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<RequestedRide>>> {
    Ok(Json(bookings::list_requested(&state, claims.sub).await?))
}
