use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use crate::config::Config;
use crate::error::{AppError, AppResult};

pub async fn connect(config: &Config) -> AppResult<DatabaseConnection> {
    connect_url(&config.database_url).await
}

pub async fn connect_url(url: &str) -> AppResult<DatabaseConnection> {
    let mut options = ConnectOptions::new(url.to_owned());
    options.sqlx_logging(false);

    // Every pooled connection to an in-memory SQLite database sees its own
    // empty database, so pin the pool to one connection.
    if url.contains(":memory:") {
        options.max_connections(1).min_connections(1);
    }

    Database::connect(options)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to connect to database: {}", e)))
}
