//! Remote backend: invite codes and admins in PostgreSQL.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use domain::models::{
    AdminUser, InviteCode, InviteCodeStats, InviteCodeStatus, InviteCodeUsage,
    InviteCodeValidation, Verdict, RECENT_USAGE_LIMIT,
};
use domain::store::{AdminStore, InviteCodeStore};
use domain::DomainError;

use crate::repositories::{AdminRepository, InviteCodeRepository};

const UNIQUE_VIOLATION: &str = "23505";

/// Maps a sqlx error onto the domain taxonomy.
pub fn db_error(err: sqlx::Error) -> DomainError {
    match &err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            DomainError::BackendUnavailable(err.to_string())
        }
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            DomainError::Conflict(db.message().to_string())
        }
        _ => DomainError::PersistenceFailure(err.to_string()),
    }
}

/// [`InviteCodeStore`] and [`AdminStore`] over a PostgreSQL pool.
#[derive(Clone)]
pub struct PgStore {
    invite_codes: InviteCodeRepository,
    admins: AdminRepository,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            invite_codes: InviteCodeRepository::new(pool.clone()),
            admins: AdminRepository::new(pool),
        }
    }
}

#[async_trait::async_trait]
impl InviteCodeStore for PgStore {
    fn backend_name(&self) -> &'static str {
        "remote"
    }

    async fn code_exists(&self, code: &str) -> Result<bool, DomainError> {
        self.invite_codes.code_exists(code).await.map_err(db_error)
    }

    async fn insert_invite_code(&self, invite: &InviteCode) -> Result<(), DomainError> {
        self.invite_codes.insert(invite).await.map_err(db_error)
    }

    async fn find_invite_code(&self, id: Uuid) -> Result<Option<InviteCode>, DomainError> {
        let entity = self.invite_codes.find_by_id(id).await.map_err(db_error)?;
        Ok(entity.map(Into::into))
    }

    async fn find_invite_code_by_code(
        &self,
        code: &str,
    ) -> Result<Option<InviteCode>, DomainError> {
        let entity = self.invite_codes.find_by_code(code).await.map_err(db_error)?;
        Ok(entity.map(Into::into))
    }

    async fn list_invite_codes(&self) -> Result<Vec<InviteCode>, DomainError> {
        let entities = self.invite_codes.list_all().await.map_err(db_error)?;
        Ok(entities.into_iter().map(Into::into).collect())
    }

    async fn set_invite_code_status(
        &self,
        id: Uuid,
        status: InviteCodeStatus,
    ) -> Result<bool, DomainError> {
        let rows = self
            .invite_codes
            .update_status(id, status.into())
            .await
            .map_err(db_error)?;
        Ok(rows > 0)
    }

    async fn delete_invite_code(&self, id: Uuid) -> Result<bool, DomainError> {
        let rows = self.invite_codes.delete(id).await.map_err(db_error)?;
        Ok(rows > 0)
    }

    async fn consume_invite_code(
        &self,
        id: Uuid,
        usage: &InviteCodeUsage,
    ) -> Result<Option<InviteCode>, DomainError> {
        let entity = self.invite_codes.consume(id, usage).await.map_err(db_error)?;
        Ok(entity.map(Into::into))
    }

    async fn list_usages_for_code(
        &self,
        code_id: Uuid,
    ) -> Result<Vec<InviteCodeUsage>, DomainError> {
        let entities = self.invite_codes.list_usages(code_id).await.map_err(db_error)?;
        Ok(entities.into_iter().map(Into::into).collect())
    }

    async fn invite_code_stats(&self) -> Result<InviteCodeStats, DomainError> {
        let counts = self.invite_codes.stats().await.map_err(db_error)?;
        let recent = self
            .invite_codes
            .recent_usages(RECENT_USAGE_LIMIT as i64)
            .await
            .map_err(db_error)?;
        Ok(counts.into_stats(recent.into_iter().map(Into::into).collect()))
    }

    /// Validates server-side; expiry is judged against the database clock.
    async fn validate_invite_code(
        &self,
        code: &str,
        _now: DateTime<Utc>,
    ) -> Result<InviteCodeValidation, DomainError> {
        let row = self.invite_codes.validate(code).await.map_err(db_error)?;
        let verdict = if row.valid {
            Verdict::Valid
        } else {
            Verdict::from_reason(row.reason.as_deref())
        };

        let invite = match row.code_id {
            Some(id) => self.find_invite_code(id).await?,
            None => None,
        };
        Ok(InviteCodeValidation::from_verdict(verdict, invite))
    }
}

#[async_trait::async_trait]
impl AdminStore for PgStore {
    async fn count_admins(&self) -> Result<i64, DomainError> {
        self.admins.count().await.map_err(db_error)
    }

    async fn find_admin_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AdminUser>, DomainError> {
        let entity = self.admins.find_by_username(username).await.map_err(db_error)?;
        Ok(entity.map(Into::into))
    }

    async fn insert_admin(&self, admin: &AdminUser) -> Result<(), DomainError> {
        self.admins.insert(admin).await.map_err(|e| match db_error(e) {
            DomainError::Conflict(_) => DomainError::Conflict(format!(
                "Admin username '{}' is already taken",
                admin.username
            )),
            other => other,
        })
    }

    async fn record_admin_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), DomainError> {
        let rows = self
            .admins
            .update_last_login(id, at)
            .await
            .map_err(db_error)?;
        if rows == 0 {
            return Err(DomainError::NotFound(format!("Admin {} not found", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_errors_mean_unavailable() {
        assert!(matches!(
            db_error(sqlx::Error::PoolTimedOut),
            DomainError::BackendUnavailable(_)
        ));
        assert!(matches!(
            db_error(sqlx::Error::PoolClosed),
            DomainError::BackendUnavailable(_)
        ));
    }

    #[test]
    fn test_other_errors_are_persistence_failures() {
        assert!(matches!(
            db_error(sqlx::Error::RowNotFound),
            DomainError::PersistenceFailure(_)
        ));
    }
}
