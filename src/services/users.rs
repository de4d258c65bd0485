use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{preferences, user};
use crate::error::{is_unique_violation, AppError, AppResult};
use crate::services::rides::find_user;
use crate::services::views::PrivateUser;
use crate::utils::jwt::create_token;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PrivateUser,
    pub preferences: PreferencesView,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: PrivateUser,
    pub preferences: PreferencesView,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferredModes {
    pub transit: bool,
    pub bike: bool,
    pub carpool: bool,
    pub driving: bool,
    pub walking: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessibility {
    pub wheelchair_accessible: bool,
    pub elevator_required: bool,
    pub avoid_stairs: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesView {
    pub max_walking_time: i32,
    pub budget_sensitivity: i32,
    pub use_by_default: bool,
    pub preferred_modes: PreferredModes,
    pub accessibility: Accessibility,
}

impl From<&preferences::Model> for PreferencesView {
    fn from(p: &preferences::Model) -> Self {
        Self {
            max_walking_time: p.max_walking_time,
            budget_sensitivity: p.budget_sensitivity,
            use_by_default: p.use_by_default,
            preferred_modes: PreferredModes {
                transit: p.prefer_transit,
                bike: p.prefer_bike,
                carpool: p.prefer_carpool,
                driving: p.prefer_driving,
                walking: p.prefer_walking,
            },
            accessibility: Accessibility {
                wheelchair_accessible: p.wheelchair_accessible,
                elevator_required: p.elevator_required,
                avoid_stairs: p.avoid_stairs,
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferredModesPatch {
    pub transit: Option<bool>,
    pub bike: Option<bool>,
    pub carpool: Option<bool>,
    pub driving: Option<bool>,
    pub walking: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessibilityPatch {
    pub wheelchair_accessible: Option<bool>,
    pub elevator_required: Option<bool>,
    pub avoid_stairs: Option<bool>,
}

/// Partial preferences update; absent fields are left as they are.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesPatch {
    pub max_walking_time: Option<i32>,
    pub budget_sensitivity: Option<i32>,
    pub use_by_default: Option<bool>,
    #[serde(default)]
    pub preferred_modes: PreferredModesPatch,
    #[serde(default)]
    pub accessibility: AccessibilityPatch,
}

fn default_preferences(user_id: Uuid) -> preferences::ActiveModel {
    preferences::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        max_walking_time: Set(15),
        budget_sensitivity: Set(50),
        use_by_default: Set(true),
        prefer_transit: Set(true),
        prefer_bike: Set(true),
        prefer_carpool: Set(false),
        prefer_driving: Set(false),
        prefer_walking: Set(true),
        wheelchair_accessible: Set(false),
        elevator_required: Set(false),
        avoid_stairs: Set(false),
        updated_at: Set(Utc::now().into()),
    }
}

async fn preferences_or_default<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
) -> AppResult<preferences::Model> {
    let find = || {
        preferences::Entity::find().filter(preferences::Column::UserId.eq(user_id))
    };

    if let Some(p) = find().one(db).await? {
        return Ok(p);
    }

    // A concurrent first read may insert the same row; keep whichever landed.
    preferences::Entity::insert(default_preferences(user_id))
        .on_conflict(
            OnConflict::column(preferences::Column::UserId)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    find()
        .one(db)
        .await?
        .ok_or_else(|| AppError::Internal("Preferences missing after insert".to_string()))
}

fn issue_token(state: &AppState, user: &user::Model) -> AppResult<String> {
    create_token(
        user.id,
        &user.email,
        &state.config.jwt_secret,
        state.config.jwt_expiration_hours,
    )
}

/// Create an account with default preferences and sign it in.
pub async fn register(state: &AppState, payload: RegisterRequest) -> AppResult<AuthResponse> {
    let name = payload.name.trim().to_string();
    let email = payload.email.trim().to_lowercase();
    if name.is_empty() || email.is_empty() || payload.password.is_empty() {
        return Err(AppError::Validation(
            "Missing required fields: name, email, password".to_string(),
        ));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(payload.password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?
        .to_string();

    let txn = state.db.begin().await?;
    let user = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email),
        password_hash: Set(password_hash),
        full_name: Set(name),
        phone: Set(payload
            .phone
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())),
        created_at: Set(Utc::now().into()),
    }
    .insert(&txn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("Email already in use".to_string())
        } else {
            AppError::Database(e)
        }
    })?;
    let prefs = default_preferences(user.id).insert(&txn).await?;
    txn.commit().await?;

    tracing::info!(user_id = %user.id, "User registered");

    Ok(AuthResponse {
        token: issue_token(state, &user)?,
        user: PrivateUser::from(&user),
        preferences: PreferencesView::from(&prefs),
    })
}

/// Exchange email and password for a token.
pub async fn login(state: &AppState, payload: LoginRequest) -> AppResult<AuthResponse> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || payload.password.is_empty() {
        return Err(AppError::Validation("Missing email or password".to_string()));
    }

    let user = user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|e| AppError::Internal(format!("Failed to parse password hash: {}", e)))?;

    Argon2::default()
        .verify_password(payload.password.as_bytes(), &parsed_hash)
        .map_err(|_| AppError::Unauthorized("Invalid email or password".to_string()))?;

    let prefs = preferences_or_default(&state.db, user.id).await?;

    Ok(AuthResponse {
        token: issue_token(state, &user)?,
        user: PrivateUser::from(&user),
        preferences: PreferencesView::from(&prefs),
    })
}

pub async fn me(state: &AppState, caller: Uuid) -> AppResult<MeResponse> {
    let user = find_user(&state.db, caller).await?;
    let prefs = preferences_or_default(&state.db, user.id).await?;
    Ok(MeResponse {
        user: PrivateUser::from(&user),
        preferences: PreferencesView::from(&prefs),
    })
}

pub async fn profile(state: &AppState, caller: Uuid) -> AppResult<PrivateUser> {
    let user = find_user(&state.db, caller).await?;
    Ok(PrivateUser::from(&user))
}

pub async fn get_preferences(state: &AppState, caller: Uuid) -> AppResult<PreferencesView> {
    let user = find_user(&state.db, caller).await?;
    let prefs = preferences_or_default(&state.db, user.id).await?;
    Ok(PreferencesView::from(&prefs))
}

pub async fn update_preferences(
    state: &AppState,
    caller: Uuid,
    patch: PreferencesPatch,
) -> AppResult<PreferencesView> {
    let user = find_user(&state.db, caller).await?;

    if let Some(minutes) = patch.max_walking_time {
        if !(0..=120).contains(&minutes) {
            return Err(AppError::Validation(
                "maxWalkingTime must be between 0 and 120".to_string(),
            ));
        }
    }
    if let Some(level) = patch.budget_sensitivity {
        if !(0..=100).contains(&level) {
            return Err(AppError::Validation(
                "budgetSensitivity must be between 0 and 100".to_string(),
            ));
        }
    }

    let prefs = preferences_or_default(&state.db, user.id).await?;
    let mut active: preferences::ActiveModel = prefs.into();

    if let Some(v) = patch.max_walking_time {
        active.max_walking_time = Set(v);
    }
    if let Some(v) = patch.budget_sensitivity {
        active.budget_sensitivity = Set(v);
    }
    if let Some(v) = patch.use_by_default {
        active.use_by_default = Set(v);
    }

    let modes = patch.preferred_modes;
    if let Some(v) = modes.transit {
        active.prefer_transit = Set(v);
    }
    if let Some(v) = modes.bike {
        active.prefer_bike = Set(v);
    }
    if let Some(v) = modes.carpool {
        active.prefer_carpool = Set(v);
    }
    if let Some(v) = modes.driving {
        active.prefer_driving = Set(v);
    }
    if let Some(v) = modes.walking {
        active.prefer_walking = Set(v);
    }

    let access = patch.accessibility;
    if let Some(v) = access.wheelchair_accessible {
        active.wheelchair_accessible = Set(v);
    }
    if let Some(v) = access.elevator_required {
        active.elevator_required = Set(v);
    }
    if let Some(v) = access.avoid_stairs {
        active.avoid_stairs = Set(v);
    }
    active.updated_at = Set(Utc::now().into());

    let prefs = active.update(&state.db).await?;
    Ok(PreferencesView::from(&prefs))
}
