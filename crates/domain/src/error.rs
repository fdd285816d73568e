//! Domain error types.

use shared::password::PasswordError;
use thiserror::Error;

/// Errors raised by invite-code and admin-account operations.
///
/// A rejected invite code is not an error; see
/// [`InviteCodeValidation`](crate::models::InviteCodeValidation).
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Could not generate a unique invite code after {attempts} attempts")]
    GenerationExhausted { attempts: u32 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvalidInput,
    BackendUnavailable,
    PersistenceFailure,
    Internal,
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::NotFound(_) => ErrorKind::NotFound,
            DomainError::Conflict(_) | DomainError::GenerationExhausted { .. } => {
                ErrorKind::Conflict
            }
            DomainError::InvalidInput(_) => ErrorKind::InvalidInput,
            DomainError::BackendUnavailable(_) => ErrorKind::BackendUnavailable,
            DomainError::PersistenceFailure(_) => ErrorKind::PersistenceFailure,
            DomainError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<validator::ValidationErrors> for DomainError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("{} is invalid", field),
                })
            })
            .collect();
        DomainError::InvalidInput(messages.join(", "))
    }
}

impl From<PasswordError> for DomainError {
    fn from(err: PasswordError) -> Self {
        DomainError::Internal(err.to_string())
    }
}
