use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

use crate::handlers::{auth, rides, users};
use crate::middleware::auth::auth_middleware;
use crate::middleware::expiry::expire_stale_requests;
use crate::middleware::rate_limit::{PUBLIC_BURST, PUBLIC_PER_MILLISECOND};
use crate::middleware::user_rate_limit::{UserIdExtractor, BURST, PER_MILLISECOND};
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    // Public routes are keyed by peer IP
    let public_governor = GovernorLayer::new(Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(PUBLIC_PER_MILLISECOND)
            .burst_size(PUBLIC_BURST)
            .finish()
            .expect("public rate limit config is valid"),
    ));

    // Authenticated routes are keyed by the token subject
    let user_governor = GovernorLayer::new(Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(PER_MILLISECOND)
            .burst_size(BURST)
            .key_extractor(UserIdExtractor)
            .finish()
            .expect("user rate limit config is valid"),
    ));

    // Public routes
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(public_governor);

    let session_routes = Router::new()
        .route("/me", get(auth::me))
        .layer(user_governor.clone())
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let user_routes = Router::new()
        .route("/me", get(users::get_me))
        .route("/me/preferences", get(users::get_preferences))
        .route("/me/preferences", put(users::update_preferences))
        .layer(user_governor.clone())
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Ride offers and seat requests; stale requests expire before each call
    let ride_routes = Router::new()
        .route("/", get(rides::list_rides))
        .route("/", post(rides::create_ride))
        .route("/mine/offered", get(rides::my_offered_rides))
        .route("/mine/requested", get(rides::my_requested_rides))
        .route("/bookings/me", get(rides::my_bookings))
        .route("/{id}", put(rides::update_ride))
        .route("/{id}", delete(rides::delete_ride))
        .route("/{id}/cancel", post(rides::cancel_ride))
        .route("/{id}/complete", post(rides::complete_ride))
        .route("/{id}/request", post(rides::request_ride))
        .route("/{id}/requests", get(rides::list_requests_for_ride))
        .route("/requests/{id}/approve", post(rides::approve_request))
        .route("/requests/{id}/reject", post(rides::reject_request))
        .route("/requests/{id}", delete(rides::cancel_request))
        .layer(middleware::from_fn_with_state(state.clone(), expire_stale_requests))
        .layer(user_governor)
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/api/health", get(health))
        .nest("/api/auth", auth_routes.merge(session_routes))
        .nest("/api/users", user_routes)
        .nest("/api/rides", ride_routes)
        .with_state(state)
}

async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "ok": true, "service": "urbix-carpool" }))
}
