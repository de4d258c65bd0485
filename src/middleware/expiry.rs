use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::services::bookings;
use crate::AppState;

/// Auto-rejects stale pending requests before the ride routes run, so every
/// read sees them already expired.
pub async fn expire_stale_requests(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if let Err(e) = bookings::expire_stale(&state).await {
        tracing::warn!(error = %e, "Expiry sweep failed");
    }
    next.run(request).await
}
