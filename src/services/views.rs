use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus};
use crate::entities::ride_post::{self, RideStatus};
use crate::entities::user;
use crate::error::AppResult;

/// What other users get to see about someone.
#[derive(Debug, Clone, Serialize)]
pub struct SafeUser {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<&user::Model> for SafeUser {
    fn from(u: &user::Model) -> Self {
        Self {
            id: u.id,
            name: u.full_name.clone(),
            created_at: u.created_at.with_timezone(&Utc),
        }
    }
}

/// The caller's own account.
#[derive(Debug, Clone, Serialize)]
pub struct PrivateUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&user::Model> for PrivateUser {
    fn from(u: &user::Model) -> Self {
        Self {
            id: u.id,
            name: u.full_name.clone(),
            email: u.email.clone(),
            phone: u.phone.clone(),
            created_at: u.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RideView {
    pub id: Uuid,
    pub departure: String,
    pub destination: String,
    pub departure_datetime: DateTime<Utc>,
    pub seats_available: i32,
    pub status: RideStatus,
    pub creator: Option<SafeUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requests_count: Option<u64>,
}

impl RideView {
    pub fn new(ride: &ride_post::Model, creator: Option<&user::Model>) -> Self {
        Self {
            id: ride.id,
            departure: ride.departure.clone(),
            destination: ride.destination.clone(),
            departure_datetime: ride.departure_datetime.with_timezone(&Utc),
            seats_available: ride.seats_available,
            status: ride.status,
            creator: creator.map(SafeUser::from),
            requests_count: None,
        }
    }

    pub fn with_requests_count(mut self, count: u64) -> Self {
        self.requests_count = Some(count);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingView {
    pub id: Uuid,
    pub ride_post_id: Uuid,
    pub passenger: Option<SafeUser>,
    pub seats_requested: i32,
    pub status: BookingStatus,
    pub matched_score: Option<f64>,
    pub status_updated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl BookingView {
    pub fn new(booking: &booking::Model, passenger: Option<&user::Model>) -> Self {
        Self {
            id: booking.id,
            ride_post_id: booking.ride_post_id,
            passenger: passenger.map(SafeUser::from),
            seats_requested: booking.seats_requested,
            status: booking.status,
            matched_score: booking.matched_score,
            status_updated_at: booking.status_updated_at.with_timezone(&Utc),
            created_at: booking.created_at.with_timezone(&Utc),
        }
    }
}

/// A booking the caller made, with the ride it targets.
#[derive(Debug, Clone, Serialize)]
pub struct RequestedRide {
    pub booking: BookingView,
    pub ride: RideView,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApprovalOutcome {
    pub booking: BookingView,
    pub ride: RideView,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelOutcome {
    pub cancelled: bool,
    pub booking: BookingView,
    pub ride: RideView,
}

/// Loads the given users keyed by id. Unknown ids are simply absent.
pub async fn users_by_id<C, I>(db: &C, ids: I) -> AppResult<HashMap<Uuid, user::Model>>
where
    C: ConnectionTrait,
    I: IntoIterator<Item = Uuid>,
{
    let ids: HashSet<Uuid> = ids.into_iter().collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let users = user::Entity::find()
        .filter(user::Column::Id.is_in(ids))
        .all(db)
        .await?;

    Ok(users.into_iter().map(|u| (u.id, u)).collect())
}
