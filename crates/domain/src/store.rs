//! Storage traits implemented by the local and remote backends.
//!
//! The services in [`crate::services`] depend only on these traits, so the
//! same business logic runs on top of either backend.

use chrono::{DateTime, Utc};
use shared::session::AdminSession;
use uuid::Uuid;

use crate::error::DomainError;
use crate::models::{
    AdminUser, InviteCode, InviteCodeStats, InviteCodeStatus, InviteCodeUsage,
    InviteCodeValidation,
};

/// Persistence of invite codes and their usage log.
#[async_trait::async_trait]
pub trait InviteCodeStore: Send + Sync {
    /// Short name of the backend, for logs and health output.
    fn backend_name(&self) -> &'static str;

    async fn code_exists(&self, code: &str) -> Result<bool, DomainError>;

    async fn insert_invite_code(&self, invite: &InviteCode) -> Result<(), DomainError>;

    async fn find_invite_code(&self, id: Uuid) -> Result<Option<InviteCode>, DomainError>;

    async fn find_invite_code_by_code(&self, code: &str)
        -> Result<Option<InviteCode>, DomainError>;

    /// All codes, newest `created_at` first.
    async fn list_invite_codes(&self) -> Result<Vec<InviteCode>, DomainError>;

    /// Overwrites the status. Returns false if the id is unknown.
    async fn set_invite_code_status(
        &self,
        id: Uuid,
        status: InviteCodeStatus,
    ) -> Result<bool, DomainError>;

    /// Removes the code. Returns false if the id is unknown.
    async fn delete_invite_code(&self, id: Uuid) -> Result<bool, DomainError>;

    /// Consumes one use of the code and appends `usage`, as one write.
    ///
    /// The increment only happens if the stored record is still consumable
    /// at write time; otherwise nothing is written and `None` is returned.
    async fn consume_invite_code(
        &self,
        id: Uuid,
        usage: &InviteCodeUsage,
    ) -> Result<Option<InviteCode>, DomainError>;

    /// Usage history of one code, newest first.
    async fn list_usages_for_code(&self, code_id: Uuid)
        -> Result<Vec<InviteCodeUsage>, DomainError>;

    async fn invite_code_stats(&self) -> Result<InviteCodeStats, DomainError>;

    /// Validates a code by exact match and persists any lazy status correction.
    ///
    /// An expired code is moved to `expired` and an exhausted one to `used`
    /// before the result is returned, so this is a write on read.
    async fn validate_invite_code(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<InviteCodeValidation, DomainError> {
        let Some(mut invite) = self.find_invite_code_by_code(code).await? else {
            return Ok(InviteCodeValidation::not_found());
        };

        let verdict = invite.classify(now);
        if let Some(status) = verdict.status_correction().filter(|s| *s != invite.status) {
            self.set_invite_code_status(invite.id, status).await?;
            invite.status = status;
        }

        Ok(InviteCodeValidation::from_verdict(verdict, Some(invite)))
    }
}

/// Persistence of admin accounts.
#[async_trait::async_trait]
pub trait AdminStore: Send + Sync {
    async fn count_admins(&self) -> Result<i64, DomainError>;

    async fn find_admin_by_username(&self, username: &str)
        -> Result<Option<AdminUser>, DomainError>;

    /// Inserts a new account; a taken username is a `Conflict`.
    async fn insert_admin(&self, admin: &AdminUser) -> Result<(), DomainError>;

    async fn record_admin_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), DomainError>;
}

/// Values owned by this client rather than shared between clients.
///
/// Always backed by client-local storage, whichever backend holds the
/// invite codes.
#[async_trait::async_trait]
pub trait ClientMemory: Send + Sync {
    /// The invite code this client last consumed, if any.
    async fn remembered_invite_code(&self) -> Result<Option<String>, DomainError>;

    async fn remember_invite_code(&self, code: &str) -> Result<(), DomainError>;

    /// Current admin session; an expired one is discarded and `None` returned.
    async fn admin_session(&self) -> Result<Option<AdminSession>, DomainError>;

    async fn save_admin_session(&self, session: &AdminSession) -> Result<(), DomainError>;

    async fn clear_admin_session(&self) -> Result<(), DomainError>;
}
