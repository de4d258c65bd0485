pub mod booking;
pub mod preferences;
pub mod ride_post;
pub mod user;
