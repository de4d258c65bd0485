use std::env;

/// Longest response window a driver can be given: one year.
pub const MAX_REQUEST_TTL_HOURS: i64 = 24 * 366;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub server_host: String,
    pub server_port: u16,
    pub frontend_origin: Option<String>,
    /// Pending requests older than this are auto-rejected.
    pub request_ttl_hours: i64,
    pub notify_webhook_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            database_url: env::var("DATABASE_URL")
                .expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET")
                .expect("JWT_SECRET must be set"),
            jwt_expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .expect("JWT_EXPIRATION_HOURS must be a number"),
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("SERVER_PORT must be a number"),
            frontend_origin: env::var("FRONTEND_ORIGIN").ok().filter(|s| !s.is_empty()),
            request_ttl_hours: parse_ttl_hours(
                &env::var("REQUEST_TTL_HOURS").unwrap_or_else(|_| "24".to_string()),
            )
            .expect("REQUEST_TTL_HOURS must be a whole number of hours"),
            notify_webhook_url: env::var("NOTIFY_WEBHOOK_URL").ok().filter(|s| !s.is_empty()),
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

/// Parses the pending-request window, accepting 1 to [`MAX_REQUEST_TTL_HOURS`].
pub fn parse_ttl_hours(raw: &str) -> Result<i64, String> {
    let hours: i64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("{:?} is not a number", raw))?;
    if !(1..=MAX_REQUEST_TTL_HOURS).contains(&hours) {
        return Err(format!(
            "{} is outside 1..={}",
            hours, MAX_REQUEST_TTL_HOURS
        ));
    }
    Ok(hours)
}
