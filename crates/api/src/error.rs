//! HTTP error type. Every failure leaves the API as `{"error", "message"}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::DomainError;
use serde::Serialize;
use shared::session::SessionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Details are logged, never returned
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'static str,
    message: &'a str,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Machine-readable error kind.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::Validation(_) => "validation_error",
            ApiError::Internal(_) => "internal_error",
            ApiError::ServiceUnavailable(_) => "service_unavailable",
        }
    }

    fn public_message(&self) -> &str {
        match self {
            ApiError::Internal(_) => "An internal error occurred",
            ApiError::Unauthorized(m)
            | ApiError::Forbidden(m)
            | ApiError::NotFound(m)
            | ApiError::Conflict(m)
            | ApiError::Validation(m)
            | ApiError::ServiceUnavailable(m) => m,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Internal(detail) => tracing::error!(detail = %detail, "Request failed"),
            ApiError::ServiceUnavailable(detail) => {
                tracing::warn!(detail = %detail, "Backend unavailable")
            }
            _ => {}
        }

        let body = ErrorBody {
            error: self.code(),
            message: self.public_message(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound(msg) => ApiError::NotFound(msg),
            DomainError::Conflict(msg) => ApiError::Conflict(msg),
            DomainError::InvalidInput(msg) => ApiError::Validation(msg),
            DomainError::BackendUnavailable(msg) => ApiError::ServiceUnavailable(msg),
            exhausted @ DomainError::GenerationExhausted { .. } => {
                ApiError::Conflict(exhausted.to_string())
            }
            DomainError::PersistenceFailure(msg) => {
                ApiError::Internal(format!("persistence: {}", msg))
            }
            DomainError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Expired => ApiError::Unauthorized("Session has expired".into()),
            SessionError::InvalidToken => ApiError::Unauthorized("Invalid session token".into()),
            SessionError::EncodingError(msg) | SessionError::InvalidSecret(msg) => {
                ApiError::Internal(msg)
            }
        }
    }
}

/// Field messages in field order, joined with `; `.
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        let message = fields
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(m) => m.to_string(),
                    None => format!("{} is invalid", field),
                })
            })
            .collect::<Vec<_>>()
            .join("; ");

        ApiError::Validation(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 1, message = "code must not be empty"))]
        code: String,
        #[validate(range(min = 1))]
        length: usize,
    }

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_internal_details_stay_out_of_the_body() {
        let (status, body) = body_json(ApiError::Internal("disk full at /var".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "internal_error");
        assert_eq!(body["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn test_client_errors_keep_their_message() {
        let (status, body) = body_json(ApiError::Forbidden("already initialized".into())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "forbidden");
        assert_eq!(body["message"], "already initialized");
    }

    #[test]
    fn test_domain_errors_map_to_statuses() {
        let cases = [
            (DomainError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (DomainError::Conflict("x".into()), StatusCode::CONFLICT),
            (
                DomainError::GenerationExhausted { attempts: 100 },
                StatusCode::CONFLICT,
            ),
            (DomainError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (
                DomainError::BackendUnavailable("x".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                DomainError::PersistenceFailure("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (DomainError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_session_errors() {
        assert!(matches!(
            ApiError::from(SessionError::Expired),
            ApiError::Unauthorized(_)
        ));
        assert!(matches!(
            ApiError::from(SessionError::InvalidToken),
            ApiError::Unauthorized(_)
        ));
        assert!(matches!(
            ApiError::from(SessionError::EncodingError("x".into())),
            ApiError::Internal(_)
        ));
    }

    #[test]
    fn test_validation_messages_are_joined_in_field_order() {
        let sample = Sample {
            code: String::new(),
            length: 0,
        };
        let err = ApiError::from(sample.validate().unwrap_err());
        match err {
            ApiError::Validation(msg) => {
                assert_eq!(msg, "code must not be empty; length is invalid")
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
