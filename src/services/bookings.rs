//! Seat requests and their approve / reject / cancel lifecycle.
//!
//! ```text
//! PENDING  --approve (owner)----> ACCEPTED   seats -= n, FULL at 0
//! PENDING  --reject (owner)-----> REJECTED
//! PENDING  --cancel (passenger)-> CANCELLED
//! ACCEPTED --cancel (passenger)-> CANCELLED  seats += n, FULL -> OPEN
//! ```
//!
//! Seats are only taken on approval, so pending requests may together exceed
//! the capacity; the approval re-checks and is the authoritative guard.

use chrono::{DateTime, Duration, FixedOffset, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus};
use crate::entities::ride_post::{self, RideStatus};
use crate::error::{AppError, AppResult};
use crate::notify::{self, Notification, NotificationKind};
use crate::services::rides::{ensure_owner, find_ride, find_user, sync_full_status};
use crate::services::views::{
    users_by_id, ApprovalOutcome, BookingView, CancelOutcome, RequestedRide, RideView,
};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RequestSeats {
    #[serde(default, alias = "seatsRequested")]
    pub seats_requested: Option<i32>,
}

async fn find_booking<C: ConnectionTrait>(db: &C, booking_id: Uuid) -> AppResult<booking::Model> {
    booking::Entity::find_by_id(booking_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Request not found".to_string()))
}

/// Moves the booking to `to` only if it is still in `from`. Losing the race
/// to a concurrent transition surfaces as an invalid state.
async fn transition<C: ConnectionTrait>(
    db: &C,
    booking_id: Uuid,
    from: BookingStatus,
    to: BookingStatus,
) -> AppResult<()> {
    let now: DateTime<FixedOffset> = Utc::now().into();
    let result = booking::Entity::update_many()
        .col_expr(booking::Column::Status, Expr::value(to))
        .col_expr(booking::Column::StatusUpdatedAt, Expr::value(now))
        .filter(booking::Column::Id.eq(booking_id))
        .filter(booking::Column::Status.eq(from))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::InvalidState(format!(
            "Request is no longer {}",
            from.label().to_lowercase()
        )));
    }
    Ok(())
}

/// Takes `seats` off the ride, refusing to go below zero, and marks it full
/// when nothing is left.
async fn take_seats<C: ConnectionTrait>(db: &C, ride_id: Uuid, seats: i32) -> AppResult<()> {
    let result = ride_post::Entity::update_many()
        .col_expr(
            ride_post::Column::SeatsAvailable,
            Expr::col(ride_post::Column::SeatsAvailable).sub(seats),
        )
        .filter(ride_post::Column::Id.eq(ride_id))
        .filter(ride_post::Column::SeatsAvailable.gte(seats))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::Conflict("Not enough seats available".to_string()));
    }

    sync_full_status(db, ride_id).await
}

/// Gives `seats` back to the ride and reopens it if it was full.
async fn return_seats<C: ConnectionTrait>(db: &C, ride_id: Uuid, seats: i32) -> AppResult<()> {
    ride_post::Entity::update_many()
        .col_expr(
            ride_post::Column::SeatsAvailable,
            Expr::col(ride_post::Column::SeatsAvailable).add(seats),
        )
        .filter(ride_post::Column::Id.eq(ride_id))
        .exec(db)
        .await?;

    sync_full_status(db, ride_id).await
}

/// Passenger asks for seats on an open ride. Nothing is reserved yet.
pub async fn request_seats(
    state: &AppState,
    ride_id: Uuid,
    caller: Uuid,
    input: RequestSeats,
) -> AppResult<BookingView> {
    let passenger = find_user(&state.db, caller).await?;
    let ride = find_ride(&state.db, ride_id).await?;

    let seats = input.seats_requested.unwrap_or(1);
    if seats < 1 {
        return Err(AppError::Validation("seatsRequested must be >= 1".to_string()));
    }
    if ride.status != RideStatus::Open {
        return Err(AppError::Conflict("Ride is not open for requests".to_string()));
    }
    if ride.creator_id == caller {
        return Err(AppError::Validation("You cannot request your own ride".to_string()));
    }

    let existing = booking::Entity::find()
        .filter(booking::Column::RidePostId.eq(ride.id))
        .filter(booking::Column::PassengerId.eq(caller))
        .filter(booking::Column::Status.is_in([BookingStatus::Pending, BookingStatus::Accepted]))
        .one(&state.db)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict(
            "You already have a booking for this ride".to_string(),
        ));
    }

    if seats > ride.seats_available {
        return Err(AppError::Conflict("Not enough seats available".to_string()));
    }

    let now: DateTime<FixedOffset> = Utc::now().into();
    let booking = booking::ActiveModel {
        id: Set(Uuid::new_v4()),
        ride_post_id: Set(ride.id),
        passenger_id: Set(caller),
        seats_requested: Set(seats),
        status: Set(BookingStatus::Pending),
        matched_score: Set(None),
        status_updated_at: Set(now),
        created_at: Set(now),
    }
    .insert(&state.db)
    .await?;

    tracing::info!(
        booking_id = %booking.id,
        ride_id = %ride.id,
        caller = %caller,
        seats,
        "Seats requested"
    );

    let driver = find_user(&state.db, ride.creator_id).await?;
    notify::dispatch(
        state.notifier.as_ref(),
        vec![Notification::about_ride(
            NotificationKind::RequestReceived,
            driver.email,
            &ride,
            seats,
            BookingStatus::Pending.label(),
        )],
    )
    .await;

    Ok(BookingView::new(&booking, Some(&passenger)))
}

/// Ride owner accepts a pending request, taking its seats off the ride.
pub async fn approve(state: &AppState, booking_id: Uuid, caller: Uuid) -> AppResult<ApprovalOutcome> {
    let txn = state.db.begin().await?;

    let booking = find_booking(&txn, booking_id).await?;
    let ride = find_ride(&txn, booking.ride_post_id).await?;
    ensure_owner(&ride, caller)?;

    if booking.status != BookingStatus::Pending {
        return Err(AppError::InvalidState("Request is not pending".to_string()));
    }
    if ride.status.is_closed() {
        return Err(AppError::InvalidState(format!(
            "Ride is {}",
            ride.status.label().to_lowercase()
        )));
    }
    if booking.seats_requested > ride.seats_available {
        return Err(AppError::Conflict("Not enough seats available".to_string()));
    }

    transition(&txn, booking.id, BookingStatus::Pending, BookingStatus::Accepted).await?;
    take_seats(&txn, ride.id, booking.seats_requested).await?;

    let booking = find_booking(&txn, booking.id).await?;
    let ride = find_ride(&txn, ride.id).await?;
    let people = users_by_id(&txn, [booking.passenger_id, ride.creator_id]).await?;
    txn.commit().await?;

    tracing::info!(
        booking_id = %booking.id,
        ride_id = %ride.id,
        seats_available = ride.seats_available,
        status = ?ride.status,
        "Request approved"
    );

    let passenger = people.get(&booking.passenger_id);
    if let Some(p) = passenger {
        notify::dispatch(
            state.notifier.as_ref(),
            vec![Notification::about_ride(
                NotificationKind::RequestApproved,
                p.email.clone(),
                &ride,
                booking.seats_requested,
                BookingStatus::Accepted.label(),
            )],
        )
        .await;
    }

    Ok(ApprovalOutcome {
        booking: BookingView::new(&booking, passenger),
        ride: RideView::new(&ride, people.get(&ride.creator_id)),
    })
}

/// Ride owner declines a pending request.
pub async fn reject(state: &AppState, booking_id: Uuid, caller: Uuid) -> AppResult<BookingView> {
    let booking = find_booking(&state.db, booking_id).await?;
    let ride = find_ride(&state.db, booking.ride_post_id).await?;
    ensure_owner(&ride, caller)?;

    if booking.status != BookingStatus::Pending {
        return Err(AppError::InvalidState("Request is not pending".to_string()));
    }

    transition(&state.db, booking.id, BookingStatus::Pending, BookingStatus::Rejected).await?;
    let booking = find_booking(&state.db, booking.id).await?;
    let passenger = find_user(&state.db, booking.passenger_id).await?;

    tracing::info!(booking_id = %booking.id, ride_id = %ride.id, "Request rejected");

    notify::dispatch(
        state.notifier.as_ref(),
        vec![Notification::about_ride(
            NotificationKind::RequestRejected,
            passenger.email.clone(),
            &ride,
            booking.seats_requested,
            BookingStatus::Rejected.label(),
        )],
    )
    .await;

    Ok(BookingView::new(&booking, Some(&passenger)))
}

/// Passenger withdraws a pending or accepted request. Accepted seats go
/// back to the ride.
pub async fn cancel(state: &AppState, booking_id: Uuid, caller: Uuid) -> AppResult<CancelOutcome> {
    let txn = state.db.begin().await?;

    let booking = find_booking(&txn, booking_id).await?;
    if booking.passenger_id != caller {
        return Err(AppError::Forbidden("Not allowed".to_string()));
    }
    if !booking.status.is_active() {
        return Err(AppError::InvalidState("Cannot cancel this request".to_string()));
    }

    let prior = booking.status;
    transition(&txn, booking.id, prior, BookingStatus::Cancelled).await?;
    if prior == BookingStatus::Accepted {
        return_seats(&txn, booking.ride_post_id, booking.seats_requested).await?;
    }

    let booking = find_booking(&txn, booking.id).await?;
    let ride = find_ride(&txn, booking.ride_post_id).await?;
    let people = users_by_id(&txn, [booking.passenger_id, ride.creator_id]).await?;
    txn.commit().await?;

    tracing::info!(
        booking_id = %booking.id,
        ride_id = %ride.id,
        prior = ?prior,
        seats_available = ride.seats_available,
        "Request cancelled"
    );

    if let Some(driver) = people.get(&ride.creator_id) {
        notify::dispatch(
            state.notifier.as_ref(),
            vec![Notification::about_ride(
                NotificationKind::RequestCancelled,
                driver.email.clone(),
                &ride,
                booking.seats_requested,
                BookingStatus::Cancelled.label(),
            )],
        )
        .await;
    }

    Ok(CancelOutcome {
        cancelled: true,
        booking: BookingView::new(&booking, people.get(&booking.passenger_id)),
        ride: RideView::new(&ride, people.get(&ride.creator_id)),
    })
}

/// All requests on a ride, newest first. Owner only.
pub async fn list_for_ride(state: &AppState, ride_id: Uuid, caller: Uuid) -> AppResult<Vec<BookingView>> {
    let ride = find_ride(&state.db, ride_id).await?;
    ensure_owner(&ride, caller)?;

    let bookings = booking::Entity::find()
        .filter(booking::Column::RidePostId.eq(ride.id))
        .order_by_desc(booking::Column::CreatedAt)
        .all(&state.db)
        .await?;

    let passengers = users_by_id(&state.db, bookings.iter().map(|b| b.passenger_id)).await?;
    Ok(bookings
        .iter()
        .map(|b| BookingView::new(b, passengers.get(&b.passenger_id)))
        .collect())
}

/// The caller's own requests, newest first.
pub async fn list_mine(state: &AppState, caller: Uuid) -> AppResult<Vec<BookingView>> {
    let me = find_user(&state.db, caller).await?;
    let bookings = booking::Entity::find()
        .filter(booking::Column::PassengerId.eq(caller))
        .order_by_desc(booking::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(bookings.iter().map(|b| BookingView::new(b, Some(&me))).collect())
}

/// The caller's own requests, newest first, each with its ride.
pub async fn list_requested(state: &AppState, caller: Uuid) -> AppResult<Vec<RequestedRide>> {
    let me = find_user(&state.db, caller).await?;
    let pairs = booking::Entity::find()
        .filter(booking::Column::PassengerId.eq(caller))
        .order_by_desc(booking::Column::CreatedAt)
        .find_also_related(ride_post::Entity)
        .all(&state.db)
        .await?;

    let creators = users_by_id(
        &state.db,
        pairs
            .iter()
            .filter_map(|(_, ride)| ride.as_ref().map(|r| r.creator_id)),
    )
    .await?;

    Ok(pairs
        .iter()
        .filter_map(|(b, ride)| {
            let ride = ride.as_ref()?;
            Some(RequestedRide {
                booking: BookingView::new(b, Some(&me)),
                ride: RideView::new(ride, creators.get(&ride.creator_id)),
            })
        })
        .collect())
}

/// Rejects pending requests older than the configured response window and
/// tells their passengers. Returns how many were rejected.
pub async fn expire_stale(state: &AppState) -> AppResult<usize> {
    let ttl = Duration::try_hours(state.config.request_ttl_hours).ok_or_else(|| {
        AppError::Internal(format!(
            "Request TTL of {} hours is out of range",
            state.config.request_ttl_hours
        ))
    })?;
    let cutoff: DateTime<FixedOffset> = Utc::now()
        .checked_sub_signed(ttl)
        .ok_or_else(|| AppError::Internal("Request TTL is out of range".to_string()))?
        .into();

    let stale = booking::Entity::find()
        .filter(booking::Column::Status.eq(BookingStatus::Pending))
        .filter(booking::Column::CreatedAt.lt(cutoff))
        .find_also_related(ride_post::Entity)
        .all(&state.db)
        .await?;

    if stale.is_empty() {
        return Ok(0);
    }

    let passengers = users_by_id(&state.db, stale.iter().map(|(b, _)| b.passenger_id)).await?;
    let mut notifications = Vec::new();
    let mut expired = 0;

    for (b, ride) in &stale {
        match transition(&state.db, b.id, BookingStatus::Pending, BookingStatus::Rejected).await {
            Ok(()) => expired += 1,
            // Someone else moved it first.
            Err(AppError::InvalidState(_)) => continue,
            Err(e) => return Err(e),
        }

        if let (Some(ride), Some(p)) = (ride, passengers.get(&b.passenger_id)) {
            notifications.push(Notification::about_ride(
                NotificationKind::RequestExpired,
                p.email.clone(),
                ride,
                b.seats_requested,
                BookingStatus::Rejected.label(),
            ));
        }
    }

    tracing::info!(expired, "Auto-rejected stale ride requests");
    notify::dispatch(state.notifier.as_ref(), notifications).await;

    Ok(expired)
}
