use axum::{extract::State, Extension, Json};

use crate::error::AppResult;
use crate::handlers::JsonBody;
use crate::services::users::{self, PreferencesPatch, PreferencesView};
use crate::services::views::PrivateUser;
use crate::utils::jwt::Claims;
use crate::AppState;

pub async fn get_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<PrivateUser>> {
    Ok(Json(users::profile(&state, claims.sub).await?))
}

pub async fn get_preferences(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<PreferencesView>> {
    Ok(Json(users::get_preferences(&state, claims.sub).await?))
}

pub async fn update_preferences(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    JsonBody(patch): JsonBody<PreferencesPatch>,
) -> AppResult<Json<PreferencesView>> {
    Ok(Json(users::update_preferences(&state, claims.sub, patch).await?))
}
