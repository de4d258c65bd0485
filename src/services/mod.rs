//! Ride-sharing lifecycle logic, kept apart from the HTTP layer.
//!
//! Every operation takes the caller's user id explicitly; handlers pass the
//! subject of the verified token.

pub mod bookings;
pub mod rides;
pub mod users;
pub mod views;
