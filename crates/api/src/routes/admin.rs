//! Admin account routes: first-run setup, login and the session slot.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use domain::models::{AdminCredentials, AdminProfile};
use serde::Serialize;
use shared::session::AdminSession;
use tracing::{info, warn};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::AdminAuth;
use crate::middleware::metrics::record_admin_login;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupStatusResponse {
    pub needs_initialization: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub admin: AdminProfile,
}

/// GET /api/v1/admin/setup
pub async fn setup_status(
    State(state): State<AppState>,
) -> Result<Json<SetupStatusResponse>, ApiError> {
    let needs_initialization = state.backends.needs_admin_initialization().await?;
    Ok(Json(SetupStatusResponse {
        needs_initialization,
    }))
}

/// Creates the first admin account.
///
/// POST /api/v1/admin/setup
///
/// Only allowed while no admin exists; the account becomes `super-admin`.
pub async fn setup_first_admin(
    State(state): State<AppState>,
    Json(request): Json<AdminCredentials>,
) -> Result<(StatusCode, Json<AdminProfile>), ApiError> {
    if !state.backends.needs_admin_initialization().await? {
        return Err(ApiError::Forbidden(
            "Admin accounts are already initialized".to_string(),
        ));
    }

    let admin = state
        .backends
        .create_admin_user(&request.username, &request.password)
        .await?;
    Ok((StatusCode::CREATED, Json(AdminProfile::from(&admin))))
}

/// POST /api/v1/admin/login
///
/// Unknown usernames and wrong passwords get the same 401.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<AdminCredentials>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Some(admin) = state
        .backends
        .admin_login(&request.username, &request.password)
        .await?
    else {
        record_admin_login(false);
        return Err(ApiError::Unauthorized(
            "Invalid username or password".to_string(),
        ));
    };
    record_admin_login(true);

    let (session, token) = state
        .sessions
        .issue(admin.id, &admin.username, admin.role.as_str())?;

    if let Err(e) = state.backends.save_admin_session(&session).await {
        warn!(error = %e, "Failed to store admin session locally");
    }

    Ok(Json(LoginResponse {
        token,
        expires_at: session.expires_at,
        admin: AdminProfile::from(&admin),
    }))
}

/// The stored session of the calling admin, while it has not expired.
///
/// GET /api/v1/admin/session
pub async fn current_session(
    State(state): State<AppState>,
    AdminAuth(session): AdminAuth,
) -> Result<Json<AdminSession>, ApiError> {
    state
        .backends
        .current_admin_session(session.admin_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::Unauthorized("No active admin session".to_string()))
}

/// Clears the stored session of the calling admin.
///
/// POST /api/v1/admin/logout
///
/// Bearer tokens are stateless and stay valid until they expire.
pub async fn logout(
    State(state): State<AppState>,
    AdminAuth(session): AdminAuth,
) -> Result<StatusCode, ApiError> {
    state.backends.clear_admin_session(session.admin_id).await?;
    info!(username = %session.username, "Admin logged out");
    Ok(StatusCode::NO_CONTENT)
}

/// Creates another admin account.
///
/// POST /api/v1/admin/users
pub async fn create_admin_user(
    State(state): State<AppState>,
    AdminAuth(session): AdminAuth,
    Json(request): Json<AdminCredentials>,
) -> Result<(StatusCode, Json<AdminProfile>), ApiError> {
    let admin = state
        .backends
        .create_admin_user(&request.username, &request.password)
        .await?;

    info!(
        created_by = %session.username,
        username = %admin.username,
        "Admin account created"
    );
    Ok((StatusCode::CREATED, Json(AdminProfile::from(&admin))))
}
