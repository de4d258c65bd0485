use axum::{extract::State, http::StatusCode, Extension, Json};

use crate::error::AppResult;
use crate::handlers::JsonBody;
use crate::services::users::{self, AuthResponse, LoginRequest, MeResponse, RegisterRequest};
use crate::utils::jwt::Claims;
use crate::AppState;

/// Register a new account
pub async fn register(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let response = users::register(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Login with email and password
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    Ok(Json(users::login(&state, payload).await?))
}

/// Current account and its preferences
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<MeResponse>> {
    Ok(Json(users::me(&state, claims.sub).await?))
}
