//! Public invite code routes used by the assessment front end.

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use domain::models::InviteCodeValidation;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::client_id::attach_client_id;
use crate::extractors::{ClientId, ClientMeta};
use crate::middleware::metrics::record_invite_code_consumption;

#[derive(Debug, Deserialize, Validate)]
pub struct ValidateRequest {
    #[validate(length(min = 1, max = 128, message = "code must be 1-128 characters"))]
    pub code: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConsumeRequest {
    #[validate(length(min = 1, max = 128, message = "code must be 1-128 characters"))]
    pub code: String,

    #[validate(length(min = 1, max = 255, message = "sessionId must be 1-255 characters"))]
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct ConsumeResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct MyInviteCodeResponse {
    pub code: Option<String>,
    pub valid: bool,
}

/// Checks a code without consuming it.
///
/// POST /api/v1/invite-codes/validate
///
/// Persists lazy status corrections (expired, used up).
pub async fn validate_invite_code(
    State(state): State<AppState>,
    Json(request): Json<ValidateRequest>,
) -> Result<Json<InviteCodeValidation>, ApiError> {
    request.validate()?;
    let validation = state.backends.validate_invite_code(&request.code).await?;
    Ok(Json(validation))
}

/// Consumes one use of a code for an assessment session.
///
/// POST /api/v1/invite-codes/consume
///
/// A client without an id gets one (cookie and `X-Client-ID`) with its
/// first successful consumption.
pub async fn consume_invite_code(
    State(state): State<AppState>,
    ClientId(known): ClientId,
    ClientMeta(client): ClientMeta,
    Json(request): Json<ConsumeRequest>,
) -> Result<Response, ApiError> {
    request.validate()?;

    let client_id = known.unwrap_or_else(Uuid::new_v4);
    let success = state
        .backends
        .use_invite_code(client_id, &request.code, &request.session_id, &client)
        .await?;
    record_invite_code_consumption(success);

    let mut response = Json(ConsumeResponse { success }).into_response();
    if success {
        info!(session_id = %request.session_id, "Invite code consumed");
        if known.is_none() {
            let secure = state.config.security.secure_cookies;
            attach_client_id(response.headers_mut(), client_id, secure);
        }
    }
    Ok(response)
}

/// The code this client last consumed, and whether it still validates.
///
/// GET /api/v1/invite-codes/mine
pub async fn my_invite_code(
    State(state): State<AppState>,
    ClientId(client_id): ClientId,
) -> Result<Json<MyInviteCodeResponse>, ApiError> {
    let Some(client_id) = client_id else {
        return Ok(Json(MyInviteCodeResponse {
            code: None,
            valid: false,
        }));
    };

    let code = state.backends.get_user_invite_code(client_id).await?;
    let valid = match code {
        Some(_) => state.backends.has_valid_user_invite_code(client_id).await?,
        None => false,
    };
    Ok(Json(MyInviteCodeResponse { code, valid }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consume_request_is_camel_case() {
        let request: ConsumeRequest =
            serde_json::from_str(r#"{"code":"ABC","sessionId":"s-1"}"#).unwrap();
        assert_eq!(request.session_id, "s-1");
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_session_id_length_bounds() {
        let request = |len: usize| ConsumeRequest {
            code: "ABC".to_string(),
            session_id: "s".repeat(len),
        };
        assert!(request(255).validate().is_ok());
        assert!(request(256).validate().is_err());
        assert!(request(0).validate().is_err());
    }

    #[test]
    fn test_empty_code_is_rejected() {
        let request = ValidateRequest {
            code: String::new(),
        };
        assert!(request.validate().is_err());
    }
}
