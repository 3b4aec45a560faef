//! services/api/src/web/auth.rs
//!
//! Authentication and profile endpoints: signup, login, logout, the current
//! user's profile and their stored preferences.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use quizforge_core::ports::PortError;

use crate::error::ApiError;
use crate::web::middleware::extract_token;
use crate::web::state::AppState;

const SESSION_LIFETIME_DAYS: i64 = 30;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub email: String,
    /// The session token, usable as `Authorization: Bearer <token>`.
    /// The same value is also set as the `session` cookie.
    pub access_token: String,
}

#[derive(Serialize, ToSchema)]
pub struct UserResponse {
    pub user_id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, ToSchema)]
pub struct SettingsUpdateRequest {
    #[schema(value_type = Object)]
    pub preferences: serde_json::Value,
}

#[derive(Serialize, ToSchema)]
pub struct SettingsResponse {
    pub user_id: Uuid,
    #[schema(value_type = Object)]
    pub preferences: serde_json::Value,
}

fn session_cookie(token: &str, max_age_seconds: i64) -> String {
    format!(
        "session={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        token, max_age_seconds
    )
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Create a new user account
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Invalid request"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn signup_handler(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            ApiError::Internal("Failed to hash password".to_string())
        })?
        .to_string();

    let user = state
        .db
        .create_user_with_email(&req.email, &password_hash, req.full_name.as_deref())
        .await?;

    let token = Uuid::new_v4().to_string();
    let expires_at = Utc::now() + Duration::days(SESSION_LIFETIME_DAYS);
    state
        .db
        .create_auth_session(&token, user.user_id, expires_at)
        .await?;

    let cookie = session_cookie(&token, Duration::days(SESSION_LIFETIME_DAYS).num_seconds());
    let response = AuthResponse {
        user_id: user.user_id,
        email: user.email,
        access_token: token,
    };

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(response),
    ))
}

/// POST /auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // A wrong email and a wrong password produce the same 401.
    let creds = state
        .db
        .get_user_by_email(&req.email)
        .await
        .map_err(|_| ApiError::Port(PortError::Unauthorized))?;

    let parsed_hash = PasswordHash::new(&creds.hashed_password).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        ApiError::Internal("Authentication error".to_string())
    })?;

    let valid = Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_ok();
    if !valid {
        return Err(ApiError::Port(
            PortError::Unauthorized,
        ));
    }

    let token = Uuid::new_v4().to_string();
    let expires_at = Utc::now() + Duration::days(SESSION_LIFETIME_DAYS);
    state
        .db
        .create_auth_session(&token, creds.user_id, expires_at)
        .await?;

    let cookie = session_cookie(&token, Duration::days(SESSION_LIFETIME_DAYS).num_seconds());
    let response = AuthResponse {
        user_id: creds.user_id,
        email: creds.email,
        access_token: token,
    };

    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(response)))
}

/// POST /auth/logout - Logout and invalidate session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = extract_token(&headers)
        .ok_or(ApiError::Port(PortError::Unauthorized))?;

    state.db.delete_auth_session(token).await?;

    let cookie = session_cookie("", 0);
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)]))
}

/// GET /users/me - Current user's profile
#[utoipa::path(
    get,
    path = "/users/me",
    responses(
        (status = 200, description = "The current user", body = UserResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Profile not found")
    )
)]
pub async fn me_handler(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.db.get_user_by_id(user_id).await?;
    Ok(Json(UserResponse {
        user_id: user.user_id,
        email: user.email,
        full_name: user.full_name,
        created_at: user.created_at,
    }))
}

/// GET /users/me/settings - Current user's preferences
#[utoipa::path(
    get,
    path = "/users/me/settings",
    responses(
        (status = 200, description = "Stored preferences (empty object if none)", body = SettingsResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn get_settings_handler(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<SettingsResponse>, ApiError> {
    let preferences = state
        .db
        .get_user_settings(user_id)
        .await?
        .unwrap_or_else(|| serde_json::json!({}));
    Ok(Json(SettingsResponse {
        user_id,
        preferences,
    }))
}

/// PUT /users/me/settings - Replace the current user's preferences
#[utoipa::path(
    put,
    path = "/users/me/settings",
    request_body = SettingsUpdateRequest,
    responses(
        (status = 200, description = "Preferences stored", body = SettingsResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn update_settings_handler(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<SettingsUpdateRequest>,
) -> Result<Json<SettingsResponse>, ApiError> {
    state
        .db
        .upsert_user_settings(user_id, &req.preferences)
        .await?;
    Ok(Json(SettingsResponse {
        user_id,
        preferences: req.preferences,
    }))
}
