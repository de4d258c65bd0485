use axum::http::Request;
use tower_governor::{key_extractor::KeyExtractor, GovernorError};
use uuid::Uuid;

use crate::utils::jwt::Claims;

/// Budget for authenticated callers: one token every `PER_MILLISECOND` ms,
/// up to `BURST` at once.
pub const PER_MILLISECOND: u64 = 600;
pub const BURST: u32 = 100;

/// Custom key extractor that extracts user ID from JWT claims in request extensions
#[derive(Debug, Clone, Copy)]
pub struct UserIdExtractor;

impl KeyExtractor for UserIdExtractor {
    type Key = Uuid;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        // Get claims from request extensions (set by auth_middleware)
        let claims = req
            .extensions()
            .get::<Claims>()
            .ok_or(GovernorError::UnableToExtractKey)?;

        Ok(claims.sub)
    }
}
