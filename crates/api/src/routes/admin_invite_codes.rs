//! Admin invite code management routes.
//!
//! Every handler requires an admin session token.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use domain::models::{
    GenerateOptions, InviteCode, InviteCodeStats, InviteCodeStatus, InviteCodeUsage,
};
use domain::services::export_filename;
use serde::{Deserialize, Serialize};
use shared::session::AdminSession;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::AdminAuth;
use crate::middleware::metrics::record_invite_codes_created;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateInviteCodeRequest {
    #[serde(flatten)]
    pub options: GenerateOptions,
    /// Creator label; defaults to the session's username.
    #[validate(length(max = 64, message = "createdBy must be at most 64 characters"))]
    pub created_by: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BatchCreateRequest {
    pub count: usize,
    #[serde(flatten)]
    pub options: GenerateOptions,
    #[validate(length(max = 64, message = "createdBy must be at most 64 characters"))]
    pub created_by: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchCreateResponse {
    pub requested: usize,
    pub created: usize,
    pub codes: Vec<InviteCode>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateQuery {
    #[validate(range(min = 1, max = 64, message = "length must be between 1 and 64"))]
    pub length: Option<usize>,
    #[validate(length(max = 16, message = "prefix must be at most 16 characters"))]
    pub prefix: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GeneratedCodeResponse {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: InviteCodeStatus,
}

/// Applies the configured default body length.
fn with_default_length(state: &AppState, mut options: GenerateOptions) -> GenerateOptions {
    if options.length.is_none() {
        options.length = Some(state.config.invite_codes.default_length);
    }
    options
}

fn creator(created_by: Option<String>, session: &AdminSession) -> String {
    created_by
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| session.username.clone())
}

/// GET /api/v1/admin/invite-codes
pub async fn list_invite_codes(
    State(state): State<AppState>,
    _auth: AdminAuth,
) -> Result<Json<Vec<InviteCode>>, ApiError> {
    Ok(Json(state.backends.get_all_invite_codes().await?))
}

/// POST /api/v1/admin/invite-codes
pub async fn create_invite_code(
    State(state): State<AppState>,
    AdminAuth(session): AdminAuth,
    Json(request): Json<CreateInviteCodeRequest>,
) -> Result<(StatusCode, Json<InviteCode>), ApiError> {
    request.validate()?;
    request.options.validate()?;
    let options = with_default_length(&state, request.options);
    let created_by = creator(request.created_by, &session);

    let invite = state
        .backends
        .create_invite_code(&options, &created_by)
        .await?;
    record_invite_codes_created(1);

    Ok((StatusCode::CREATED, Json(invite)))
}

/// Creates `count` codes with the same options; failed items are skipped.
///
/// POST /api/v1/admin/invite-codes/batch
pub async fn batch_create_invite_codes(
    State(state): State<AppState>,
    AdminAuth(session): AdminAuth,
    Json(request): Json<BatchCreateRequest>,
) -> Result<(StatusCode, Json<BatchCreateResponse>), ApiError> {
    let max = state.config.invite_codes.max_batch_size;
    if request.count == 0 || request.count > max {
        return Err(ApiError::Validation(format!(
            "count must be between 1 and {}",
            max
        )));
    }
    // Reject bad options once instead of once per item.
    request.validate()?;
    request.options.validate()?;

    let options = with_default_length(&state, request.options);
    let created_by = creator(request.created_by, &session);

    let codes = state
        .backends
        .batch_create_invite_codes(request.count, &options, &created_by)
        .await?;
    record_invite_codes_created(codes.len());

    Ok((
        StatusCode::CREATED,
        Json(BatchCreateResponse {
            requested: request.count,
            created: codes.len(),
            codes,
        }),
    ))
}

/// GET /api/v1/admin/invite-codes/stats
pub async fn invite_code_stats(
    State(state): State<AppState>,
    _auth: AdminAuth,
) -> Result<Json<InviteCodeStats>, ApiError> {
    Ok(Json(state.backends.get_invite_code_stats().await?))
}

/// Downloads every code as CSV.
///
/// GET /api/v1/admin/invite-codes/export
pub async fn export_invite_codes(
    State(state): State<AppState>,
    _auth: AdminAuth,
) -> Result<Response, ApiError> {
    let csv = state.backends.export_invite_codes_csv().await?;
    let disposition = format!("attachment; filename=\"{}\"", export_filename(Utc::now()));

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}

/// Preview of a generated code; nothing is stored.
///
/// GET /api/v1/admin/invite-codes/generate
pub async fn generate_code(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Query(query): Query<GenerateQuery>,
) -> Result<Json<GeneratedCodeResponse>, ApiError> {
    query.validate()?;
    let length = query
        .length
        .unwrap_or(state.config.invite_codes.default_length);
    let prefix = query.prefix.as_deref().filter(|p| !p.is_empty());

    Ok(Json(GeneratedCodeResponse {
        code: state.backends.generate_random_code(length, prefix),
    }))
}

/// GET /api/v1/admin/invite-codes/:id
pub async fn get_invite_code(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<InviteCode>, ApiError> {
    Ok(Json(state.backends.get_invite_code(id).await?))
}

/// Admin status override; any status may be set.
///
/// PATCH /api/v1/admin/invite-codes/:id/status
pub async fn update_invite_code_status(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<InviteCode>, ApiError> {
    if !state
        .backends
        .update_invite_code_status(id, request.status)
        .await?
    {
        return Err(ApiError::NotFound(format!("Invite code {} not found", id)));
    }
    Ok(Json(state.backends.get_invite_code(id).await?))
}

/// DELETE /api/v1/admin/invite-codes/:id
pub async fn delete_invite_code(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.backends.delete_invite_code(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Invite code {} not found", id)))
    }
}

/// Usage history, newest first.
///
/// GET /api/v1/admin/invite-codes/:id/usages
pub async fn invite_code_usages(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<InviteCodeUsage>>, ApiError> {
    Ok(Json(state.backends.get_invite_code_usages(id).await?))
}
