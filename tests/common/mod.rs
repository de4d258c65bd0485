#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, Set};
use sea_orm_migration::MigratorTrait;
use uuid::Uuid;

use urbix_carpool::{
    config::Config,
    db,
    entities::user,
    notify::{Notification, NotificationKind, Notifier},
    services::rides::{self, CreateRide},
    services::views::RideView,
    AppResult, AppState,
};

/// Keeps every notification instead of sending it.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn of_kind(&self, kind: NotificationKind) -> Vec<Notification> {
        self.sent().into_iter().filter(|n| n.kind == kind).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: Notification) -> AppResult<()> {
        self.sent.lock().unwrap().push(notification);
        Ok(())
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test-secret".to_string(),
        jwt_expiration_hours: 1,
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        frontend_origin: None,
        request_ttl_hours: 24,
        notify_webhook_url: None,
    }
}

/// Fresh migrated in-memory database and a recording notifier.
pub async fn test_state() -> (AppState, Arc<RecordingNotifier>) {
    let config = test_config();
    let db = db::connect(&config).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();

    let notifier = Arc::new(RecordingNotifier::default());
    let state = AppState {
        db,
        config,
        notifier: notifier.clone(),
    };
    (state, notifier)
}

/// Inserts a user directly, skipping password hashing.
pub async fn user(state: &AppState, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    user::ActiveModel {
        id: Set(id),
        email: Set(format!("{}@urbix.test", name.to_lowercase())),
        password_hash: Set("not-a-real-hash".to_string()),
        full_name: Set(name.to_string()),
        phone: Set(None),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.db)
    .await
    .unwrap();
    id
}

pub fn email_of(name: &str) -> String {
    format!("{}@urbix.test", name.to_lowercase())
}

/// A `YYYY-MM-DD` date safely in the future.
pub fn future_date() -> String {
    (Utc::now() + Duration::days(3)).format("%Y-%m-%d").to_string()
}

pub fn offer(seats: i32) -> CreateRide {
    CreateRide {
        departure: "Plateau Mont-Royal".to_string(),
        destination: "Old Port".to_string(),
        date: future_date(),
        time: "08:30".to_string(),
        seats_available: Some(seats),
    }
}

pub async fn ride(state: &AppState, driver: Uuid, seats: i32) -> RideView {
    rides::create(state, driver, offer(seats)).await.unwrap()
}
