pub mod datetime;
pub mod jwt;
