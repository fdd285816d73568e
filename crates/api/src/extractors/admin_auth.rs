//! Admin session authentication extractor.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use shared::session::AdminSession;

use crate::app::AppState;
use crate::error::ApiError;

/// The admin session carried by a valid `Authorization: Bearer` token.
#[derive(Debug, Clone)]
pub struct AdminAuth(pub AdminSession);

/// Token part of an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;

        let token = bearer_token(auth_header).ok_or_else(|| {
            ApiError::Unauthorized("Invalid Authorization header format".to_string())
        })?;

        let session = state.sessions.verify(token)?;
        Ok(AdminAuth(session))
    }
}
