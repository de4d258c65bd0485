//! Outbound notifications for ride and booking events.
//!
//! Services build [`Notification`]s while they hold the data and hand them to
//! [`dispatch`] once their transaction has committed. Delivery problems are
//! logged and never fail the request that triggered them.

mod logger;
mod webhook;

pub use self::logger::LogNotifier;
pub use self::webhook::WebhookNotifier;

use async_trait::async_trait;
use serde::Serialize;

use crate::entities::ride_post;
use crate::error::AppResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// To the driver: a passenger asked for seats.
    RequestReceived,
    RequestApproved,
    RequestRejected,
    /// The driver let the request sit past the response window.
    RequestExpired,
    /// To each passenger holding a claim on a ride the driver withdrew.
    RideCancelled,
    /// To the driver: a passenger withdrew their request.
    RequestCancelled,
}

impl NotificationKind {
    pub fn subject(self) -> &'static str {
        match self {
            NotificationKind::RequestReceived => "UrbiX: New ride request",
            NotificationKind::RequestApproved => "UrbiX: Ride request approved",
            NotificationKind::RequestRejected => "UrbiX: Ride request rejected",
            NotificationKind::RequestExpired => "UrbiX: Ride request auto-rejected (no response)",
            NotificationKind::RideCancelled => "UrbiX: Ride cancelled",
            NotificationKind::RequestCancelled => "UrbiX: Ride request cancelled",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DetailRow {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub to_email: String,
    pub subject: String,
    pub body: String,
    pub rows: Vec<DetailRow>,
}

impl Notification {
    /// Builds the message for `kind` about `ride`, with the seat count of the
    /// booking involved and the status label shown to the recipient.
    pub fn about_ride(
        kind: NotificationKind,
        to_email: impl Into<String>,
        ride: &ride_post::Model,
        seats_requested: i32,
        status_label: &str,
    ) -> Self {
        let route = format!("{} → {}", ride.departure, ride.destination);
        let when = ride.departure_datetime.to_rfc3339();

        let body = match kind {
            NotificationKind::RequestReceived => format!(
                "A user requested your ride {route} at {when}.\n\n\
                 Seats requested: {seats_requested}\n\
                 Open UrbiX → My Rides to approve/reject."
            ),
            NotificationKind::RequestApproved => {
                format!("Your request was approved for {route} at {when}.")
            }
            NotificationKind::RequestRejected => {
                format!("Your request was rejected for {route} at {when}.")
            }
            NotificationKind::RequestExpired => format!(
                "Your request for {route} at {when} was auto-rejected because \
                 the driver didn't respond in time."
            ),
            NotificationKind::RideCancelled => {
                format!("The ride {route} at {when} was cancelled by the driver.")
            }
            NotificationKind::RequestCancelled => format!(
                "A passenger cancelled their request for your ride {route} at {when}."
            ),
        };

        let rows = vec![
            DetailRow::new("Route", route),
            DetailRow::new("Departure", when),
            DetailRow::new("Seats available", ride.seats_available.to_string()),
            DetailRow::new("Seats requested", seats_requested.to_string()),
            DetailRow::new("Status", status_label),
        ];

        Self {
            kind,
            to_email: to_email.into(),
            subject: kind.subject().to_string(),
            body,
            rows,
        }
    }
}

impl DetailRow {
    fn new(label: &str, value: impl Into<String>) -> Self {
        Self {
            label: label.to_string(),
            value: value.into(),
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: Notification) -> AppResult<()>;
}

/// Delivers each notification, logging failures instead of returning them.
pub async fn dispatch(notifier: &dyn Notifier, notifications: Vec<Notification>) {
    for notification in notifications {
        let kind = notification.kind;
        let to = notification.to_email.clone();
        if let Err(e) = notifier.send(notification).await {
            tracing::warn!(?kind, to = %to, error = %e, "Notification delivery failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use crate::entities::ride_post::RideStatus;

    fn ride() -> ride_post::Model {
        let departs = Utc.with_ymd_and_hms(2030, 3, 1, 9, 30, 0).unwrap();
        ride_post::Model {
            id: Uuid::new_v4(),
            creator_id: Uuid::new_v4(),
            departure: "Plateau".into(),
            destination: "Old Port".into(),
            departure_datetime: departs.into(),
            seats_available: 3,
            status: RideStatus::Open,
            created_at: Utc::now().into(),
        }
    }

    #[test]
    fn request_received_tells_driver_how_many_seats() {
        let n = Notification::about_ride(
            NotificationKind::RequestReceived,
            "driver@urbix.test",
            &ride(),
            2,
            "Pending",
        );
        assert_eq!(n.subject, "UrbiX: New ride request");
        assert!(n.body.contains("Plateau → Old Port"));
        assert!(n.body.contains("Seats requested: 2"));
        let status = n.rows.iter().find(|r| r.label == "Status").unwrap();
        assert_eq!(status.value, "Pending");
    }

    #[test]
    fn each_kind_has_its_own_subject() {
        let kinds = [
            NotificationKind::RequestReceived,
            NotificationKind::RequestApproved,
            NotificationKind::RequestRejected,
            NotificationKind::RequestExpired,
            NotificationKind::RideCancelled,
            NotificationKind::RequestCancelled,
        ];
        let mut subjects: Vec<_> = kinds.iter().map(|k| k.subject()).collect();
        subjects.sort();
        subjects.dedup();
        assert_eq!(subjects.len(), kinds.len());
    }
}
