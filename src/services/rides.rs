//! Ride offers: creation, listing, owner edits, cancellation and removal.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus};
use crate::entities::ride_post::{self, RideStatus};
use crate::entities::user;
use crate::error::{AppError, AppResult};
use crate::notify::{self, Notification, NotificationKind};
use crate::services::views::{users_by_id, RideView};
use crate::utils::datetime::{day_bounds, parse_date, parse_departure, parse_future_departure};
use crate::AppState;

pub const MAX_SEATS: i32 = 8;

#[derive(Debug, Default, Deserialize)]
pub struct CreateRide {
    #[serde(default)]
    pub departure: String,
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default, alias = "seatsAvailable", alias = "seats")]
    pub seats_available: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateRide {
    pub departure: Option<String>,
    pub destination: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    #[serde(default, alias = "seatsAvailable")]
    pub seats_available: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RideFilter {
    pub departure: Option<String>,
    pub destination: Option<String>,
    /// `YYYY-MM-DD`
    pub date: Option<String>,
}

fn required_place(value: &str, field: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{} must not be empty", field)));
    }
    Ok(trimmed.to_string())
}

/// Seats on a new offer: 1 to [`MAX_SEATS`].
pub fn validate_offered_seats(seats: i32) -> AppResult<i32> {
    if !(1..=MAX_SEATS).contains(&seats) {
        return Err(AppError::Validation(format!(
            "seatsAvailable must be between 1 and {}",
            MAX_SEATS
        )));
    }
    Ok(seats)
}

/// Seats on an edit may drop to zero, which marks the ride full.
pub fn validate_edited_seats(seats: i32) -> AppResult<i32> {
    if !(0..=MAX_SEATS).contains(&seats) {
        return Err(AppError::Validation(format!(
            "seatsAvailable must be between 0 and {}",
            MAX_SEATS
        )));
    }
    Ok(seats)
}

pub(crate) fn ensure_owner(ride: &ride_post::Model, caller: Uuid) -> AppResult<()> {
    if ride.creator_id != caller {
        return Err(AppError::Forbidden("Not allowed".to_string()));
    }
    Ok(())
}

pub(crate) async fn find_ride<C: ConnectionTrait>(db: &C, ride_id: Uuid) -> AppResult<ride_post::Model> {
    ride_post::Entity::find_by_id(ride_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Ride not found".to_string()))
}

pub(crate) async fn find_user<C: ConnectionTrait>(db: &C, user_id: Uuid) -> AppResult<user::Model> {
    user::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

async fn request_counts<C: ConnectionTrait>(
    db: &C,
    ride_ids: Vec<Uuid>,
) -> AppResult<HashMap<Uuid, u64>> {
    if ride_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let counts: Vec<(Uuid, i64)> = booking::Entity::find()
        .select_only()
        .column(booking::Column::RidePostId)
        .column_as(Expr::col(booking::Column::Id).count(), "requests")
        .filter(booking::Column::RidePostId.is_in(ride_ids))
        .group_by(booking::Column::RidePostId)
        .into_tuple()
        .all(db)
        .await?;

    Ok(counts
        .into_iter()
        .map(|(ride_id, n)| (ride_id, n.max(0) as u64))
        .collect())
}

/// Brings OPEN/FULL in line with the stored seat count in single guarded
/// statements. Closed rides are never touched.
pub(crate) async fn sync_full_status<C: ConnectionTrait>(db: &C, ride_id: Uuid) -> AppResult<()> {
    ride_post::Entity::update_many()
        .col_expr(ride_post::Column::Status, Expr::value(RideStatus::Full))
        .filter(ride_post::Column::Id.eq(ride_id))
        .filter(ride_post::Column::Status.eq(RideStatus::Open))
        .filter(ride_post::Column::SeatsAvailable.lte(0))
        .exec(db)
        .await?;

    ride_post::Entity::update_many()
        .col_expr(ride_post::Column::Status, Expr::value(RideStatus::Open))
        .filter(ride_post::Column::Id.eq(ride_id))
        .filter(ride_post::Column::Status.eq(RideStatus::Full))
        .filter(ride_post::Column::SeatsAvailable.gt(0))
        .exec(db)
        .await?;
    Ok(())
}

async fn views_with_counts<C: ConnectionTrait>(
    db: &C,
    rides: Vec<ride_post::Model>,
) -> AppResult<Vec<RideView>> {
    let creators = users_by_id(db, rides.iter().map(|r| r.creator_id)).await?;
    let counts = request_counts(db, rides.iter().map(|r| r.id).collect()).await?;

    Ok(rides
        .iter()
        .map(|r| {
            RideView::new(r, creators.get(&r.creator_id))
                .with_requests_count(counts.get(&r.id).copied().unwrap_or(0))
        })
        .collect())
}

/// Publish a new ride offer owned by `caller`.
pub async fn create(state: &AppState, caller: Uuid, input: CreateRide) -> AppResult<RideView> {
    let creator = find_user(&state.db, caller).await?;

    if input.date.trim().is_empty() || input.time.trim().is_empty() {
        return Err(AppError::Validation(
            "Missing required fields: departure, destination, date, time".to_string(),
        ));
    }
    let departure = required_place(&input.departure, "departure")?;
    let destination = required_place(&input.destination, "destination")?;
    let departs_at = parse_future_departure(&input.date, &input.time, Utc::now())?;
    let seats = validate_offered_seats(input.seats_available.unwrap_or(1))?;

    let now = Utc::now();
    let ride = ride_post::ActiveModel {
        id: Set(Uuid::new_v4()),
        creator_id: Set(creator.id),
        departure: Set(departure),
        destination: Set(destination),
        departure_datetime: Set(departs_at.into()),
        seats_available: Set(seats),
        status: Set(RideStatus::Open),
        created_at: Set(now.into()),
    }
    .insert(&state.db)
    .await?;

    tracing::info!(ride_id = %ride.id, caller = %caller, seats, "Ride offer created");

    Ok(RideView::new(&ride, Some(&creator)))
}

/// Every ride regardless of status, soonest departure first, optionally
/// narrowed by place substrings and departure day.
pub async fn list(state: &AppState, filter: RideFilter) -> AppResult<Vec<RideView>> {
    let mut query = ride_post::Entity::find();

    if let Some(departure) = filter.departure.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        query = query.filter(
            Expr::expr(Func::lower(Expr::col(ride_post::Column::Departure)))
                .like(format!("%{}%", departure.to_lowercase())),
        );
    }
    if let Some(destination) = filter.destination.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        query = query.filter(
            Expr::expr(Func::lower(Expr::col(ride_post::Column::Destination)))
                .like(format!("%{}%", destination.to_lowercase())),
        );
    }
    if let Some(date) = filter.date.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let (start, end) = day_bounds(parse_date(date)?);
        let start: DateTime<FixedOffset> = start.into();
        let end: DateTime<FixedOffset> = end.into();
        query = query
            .filter(ride_post::Column::DepartureDatetime.gte(start))
            .filter(ride_post::Column::DepartureDatetime.lt(end));
    }

    let rides = query
        .order_by_asc(ride_post::Column::DepartureDatetime)
        .all(&state.db)
        .await?;

    views_with_counts(&state.db, rides).await
}

/// Rides offered by `caller`, latest departure first.
pub async fn list_offered(state: &AppState, caller: Uuid) -> AppResult<Vec<RideView>> {
    let rides = ride_post::Entity::find()
        .filter(ride_post::Column::CreatorId.eq(caller))
        .order_by_desc(ride_post::Column::DepartureDatetime)
        .all(&state.db)
        .await?;

    views_with_counts(&state.db, rides).await
}

/// Owner edit. Lowering the seat count does not revisit bookings that were
/// already accepted. The status is never written from the row read here; it
/// is re-derived from the stored seat count after the edit.
pub async fn update(
    state: &AppState,
    ride_id: Uuid,
    caller: Uuid,
    input: UpdateRide,
) -> AppResult<RideView> {
    let txn = state.db.begin().await?;

    let ride = find_ride(&txn, ride_id).await?;
    ensure_owner(&ride, caller)?;

    let mut active: ride_post::ActiveModel = ride.into();

    if let Some(departure) = input.departure {
        active.departure = Set(required_place(&departure, "departure")?);
    }
    if let Some(destination) = input.destination {
        active.destination = Set(required_place(&destination, "destination")?);
    }
    match (input.date, input.time) {
        (Some(date), Some(time)) => {
            let departs_at = parse_departure(&date, &time)?;
            if departs_at <= Utc::now() {
                return Err(AppError::Validation(
                    "You cannot set a ride in the past".to_string(),
                ));
            }
            active.departure_datetime = Set(departs_at.into());
        }
        (None, None) => {}
        _ => {
            return Err(AppError::Validation(
                "date and time must be provided together".to_string(),
            ));
        }
    }
    if let Some(new_seats) = input.seats_available {
        active.seats_available = Set(validate_edited_seats(new_seats)?);
    }

    if active.is_changed() {
        active.update(&txn).await?;
    }
    sync_full_status(&txn, ride_id).await?;

    let ride = find_ride(&txn, ride_id).await?;
    let creator = find_user(&txn, ride.creator_id).await?;
    txn.commit().await?;

    tracing::info!(ride_id = %ride.id, caller = %caller, status = ?ride.status, "Ride offer updated");

    Ok(RideView::new(&ride, Some(&creator)))
}

/// Cancels every booking on `ride_id` that still holds a claim and returns
/// one notification per affected passenger.
async fn cancel_active_bookings<C: ConnectionTrait>(
    db: &C,
    ride: &ride_post::Model,
) -> AppResult<Vec<Notification>> {
    let active = booking::Entity::find()
        .filter(booking::Column::RidePostId.eq(ride.id))
        .filter(booking::Column::Status.is_in([BookingStatus::Pending, BookingStatus::Accepted]))
        .all(db)
        .await?;

    if active.is_empty() {
        return Ok(Vec::new());
    }

    let now: DateTime<FixedOffset> = Utc::now().into();
    booking::Entity::update_many()
        .col_expr(booking::Column::Status, Expr::value(BookingStatus::Cancelled))
        .col_expr(booking::Column::StatusUpdatedAt, Expr::value(now))
        .filter(booking::Column::RidePostId.eq(ride.id))
        .filter(booking::Column::Status.is_in([BookingStatus::Pending, BookingStatus::Accepted]))
        .exec(db)
        .await?;

    let passengers = users_by_id(db, active.iter().map(|b| b.passenger_id)).await?;
    Ok(active
        .iter()
        .filter_map(|b| {
            let passenger = passengers.get(&b.passenger_id)?;
            Some(Notification::about_ride(
                NotificationKind::RideCancelled,
                passenger.email.clone(),
                ride,
                b.seats_requested,
                BookingStatus::Cancelled.label(),
            ))
        })
        .collect())
}

/// Owner withdraws the offer. The ride stays listed as CANCELLED and its
/// pending and accepted bookings are cancelled.
pub async fn cancel(state: &AppState, ride_id: Uuid, caller: Uuid) -> AppResult<RideView> {
    let txn = state.db.begin().await?;

    let ride = find_ride(&txn, ride_id).await?;
    ensure_owner(&ride, caller)?;
    if ride.status.is_closed() {
        return Err(AppError::InvalidState(format!(
            "Ride is already {}",
            ride.status.label().to_lowercase()
        )));
    }

    let mut active: ride_post::ActiveModel = ride.into();
    active.status = Set(RideStatus::Cancelled);
    let ride = active.update(&txn).await?;

    let notifications = cancel_active_bookings(&txn, &ride).await?;
    let creator = find_user(&txn, ride.creator_id).await?;
    txn.commit().await?;

    tracing::info!(
        ride_id = %ride.id,
        caller = %caller,
        bookings_cancelled = notifications.len(),
        "Ride offer cancelled"
    );
    notify::dispatch(state.notifier.as_ref(), notifications).await;

    Ok(RideView::new(&ride, Some(&creator)))
}

/// Owner marks the ride as done. Only open or full rides can complete.
pub async fn complete(state: &AppState, ride_id: Uuid, caller: Uuid) -> AppResult<RideView> {
    let ride = find_ride(&state.db, ride_id).await?;
    ensure_owner(&ride, caller)?;
    if ride.status.is_closed() {
        return Err(AppError::InvalidState(format!(
            "Ride is already {}",
            ride.status.label().to_lowercase()
        )));
    }

    let mut active: ride_post::ActiveModel = ride.into();
    active.status = Set(RideStatus::Completed);
    let ride = active.update(&state.db).await?;
    let creator = find_user(&state.db, ride.creator_id).await?;

    tracing::info!(ride_id = %ride.id, caller = %caller, "Ride offer completed");

    Ok(RideView::new(&ride, Some(&creator)))
}

/// Owner removes the offer. Bookings still holding a claim are cancelled
/// and their passengers told; the rows then go with the ride through the
/// foreign key cascade.
pub async fn delete(state: &AppState, ride_id: Uuid, caller: Uuid) -> AppResult<()> {
    let txn = state.db.begin().await?;

    let ride = find_ride(&txn, ride_id).await?;
    ensure_owner(&ride, caller)?;

    let notifications = cancel_active_bookings(&txn, &ride).await?;
    ride_post::Entity::delete_by_id(ride.id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(
        ride_id = %ride.id,
        caller = %caller,
        bookings_cancelled = notifications.len(),
        "Ride offer deleted"
    );
    notify::dispatch(state.notifier.as_ref(), notifications).await;

    Ok(())
}
