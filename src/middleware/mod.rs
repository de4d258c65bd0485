pub mod auth;
pub mod expiry;
pub mod rate_limit;
pub mod user_rate_limit;
