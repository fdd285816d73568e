//! Invite code repository for database operations.

use sqlx::PgPool;
use uuid::Uuid;

use domain::models::{InviteCode, InviteCodeUsage};

use crate::entities::{
    CodeValidationEntity, InviteCodeEntity, InviteCodeStatusDb, InviteCodeTypeDb,
    InviteCodeUsageEntity, InviteStatsEntity,
};
use crate::metrics::{record_consume_rejected, QueryTimer};

const INVITE_CODE_COLUMNS: &str = "id, code, type, max_uses, used_count, status, created_at, \
     expires_at, created_by, note, metadata";

/// Repository for invite codes and their usage log.
#[derive(Clone)]
pub struct InviteCodeRepository {
    pool: PgPool,
}

impl InviteCodeRepository {
    /// Creates a new InviteCodeRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Check if code exists.
    pub async fn code_exists(&self, code: &str) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::start("check_invite_code_exists");
        let result = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(SELECT 1 FROM invite_codes WHERE code = $1)
            "#,
        )
        .bind(code)
        .fetch_one(&self.pool)
        .await;
        timer.finish();
        result
    }

    pub async fn insert(&self, invite: &InviteCode) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::start("insert_invite_code");
        let result = sqlx::query(
            r#"
            INSERT INTO invite_codes
                (id, code, type, max_uses, used_count, status, created_at, expires_at,
                 created_by, note, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(invite.id)
        .bind(&invite.code)
        .bind(InviteCodeTypeDb::from(invite.code_type))
        .bind(invite.max_uses)
        .bind(invite.used_count)
        .bind(InviteCodeStatusDb::from(invite.status))
        .bind(invite.created_at)
        .bind(invite.expires_at)
        .bind(&invite.created_by)
        .bind(&invite.note)
        .bind(&invite.metadata)
        .execute(&self.pool)
        .await;
        timer.finish();
        result.map(|_| ())
    }

    /// Find invite code by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<InviteCodeEntity>, sqlx::Error> {
        let timer = QueryTimer::start("find_invite_code_by_id");
        let result = sqlx::query_as::<_, InviteCodeEntity>(&format!(
            "SELECT {} FROM invite_codes WHERE id = $1",
            INVITE_CODE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.finish();
        result
    }

    /// Find invite code by its exact code string.
    pub async fn find_by_code(&self, code: &str) -> Result<Option<InviteCodeEntity>, sqlx::Error> {
        let timer = QueryTimer::start("find_invite_code_by_code");
        let result = sqlx::query_as::<_, InviteCodeEntity>(&format!(
            "SELECT {} FROM invite_codes WHERE code = $1",
            INVITE_CODE_COLUMNS
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await;
        timer.finish();
        result
    }

    /// List all invite codes, newest first.
    pub async fn list_all(&self) -> Result<Vec<InviteCodeEntity>, sqlx::Error> {
        let timer = QueryTimer::start("list_invite_codes");
        let result = sqlx::query_as::<_, InviteCodeEntity>(&format!(
            "SELECT {} FROM invite_codes_with_creator ORDER BY created_at DESC",
            INVITE_CODE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await;
        timer.finish();
        result
    }

    pub async fn update_status(
        &self,
        id: Uuid,
        status: InviteCodeStatusDb,
    ) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::start("update_invite_code_status");
        let result = sqlx::query(
            r#"
            UPDATE invite_codes
            SET status = $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .execute(&self.pool)
        .await;
        timer.finish();
        result.map(|r| r.rows_affected())
    }

    /// Delete an invite code; its usages go with it.
    pub async fn delete(&self, id: Uuid) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::start("delete_invite_code");
        let result = sqlx::query("DELETE FROM invite_codes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await;
        timer.finish();
        result.map(|r| r.rows_affected())
    }

    /// Consume one use and log it, in one transaction.
    ///
    /// The increment is conditional on the row still being consumable, so
    /// concurrent consumers cannot push `used_count` past `max_uses`.
    /// Returns `None` when the condition no longer holds.
    pub async fn consume(
        &self,
        id: Uuid,
        usage: &InviteCodeUsage,
    ) -> Result<Option<InviteCodeEntity>, sqlx::Error> {
        let timer = QueryTimer::start("consume_invite_code");
        let result = self.consume_in_transaction(id, usage).await;
        timer.finish();
        if let Ok(None) = result {
            record_consume_rejected();
        }
        result
    }

    async fn consume_in_transaction(
        &self,
        id: Uuid,
        usage: &InviteCodeUsage,
    ) -> Result<Option<InviteCodeEntity>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, InviteCodeEntity>(&format!(
            r#"
            UPDATE invite_codes
            SET used_count = used_count + 1,
                status = CASE
                    WHEN max_uses <> -1 AND used_count + 1 >= max_uses
                        THEN 'used'::invite_code_status
                    ELSE status
                END
            WHERE id = $1
              AND status = 'active'
              AND (max_uses = -1 OR used_count < max_uses)
              AND (expires_at IS NULL OR expires_at > NOW())
            RETURNING {}
            "#,
            INVITE_CODE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        if updated.is_some() {
            sqlx::query(
                r#"
                INSERT INTO invite_code_usages
                    (id, code_id, code, used_at, session_id, user_agent, ip_address)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(usage.id)
            .bind(usage.code_id)
            .bind(&usage.code)
            .bind(usage.used_at)
            .bind(&usage.session_id)
            .bind(&usage.user_agent)
            .bind(&usage.ip_address)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(updated)
    }

    /// Usage history for one code, newest first.
    pub async fn list_usages(
        &self,
        code_id: Uuid,
    ) -> Result<Vec<InviteCodeUsageEntity>, sqlx::Error> {
        let timer = QueryTimer::start("list_invite_code_usages");
        let result = sqlx::query_as::<_, InviteCodeUsageEntity>(
            r#"
            SELECT id, code_id, code, used_at, session_id, user_agent, ip_address
            FROM invite_code_usages
            WHERE code_id = $1
            ORDER BY used_at DESC
            "#,
        )
        .bind(code_id)
        .fetch_all(&self.pool)
        .await;
        timer.finish();
        result
    }

    pub async fn recent_usages(
        &self,
        limit: i64,
    ) -> Result<Vec<InviteCodeUsageEntity>, sqlx::Error> {
        let timer = QueryTimer::start("list_recent_invite_code_usages");
        let result = sqlx::query_as::<_, InviteCodeUsageEntity>(
            r#"
            SELECT id, code_id, code, used_at, session_id, user_agent, ip_address
            FROM invite_code_usages
            ORDER BY used_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await;
        timer.finish();
        result
    }

    /// Validate through the server-side function, which applies lazy
    /// status correction in the same statement.
    pub async fn validate(&self, code: &str) -> Result<CodeValidationEntity, sqlx::Error> {
        let timer = QueryTimer::start("validate_invite_code");
        let result = sqlx::query_as::<_, CodeValidationEntity>(
            "SELECT valid, code_id, reason FROM validate_invite_code($1)",
        )
        .bind(code)
        .fetch_one(&self.pool)
        .await;
        timer.finish();
        result
    }

    pub async fn stats(&self) -> Result<InviteStatsEntity, sqlx::Error> {
        let timer = QueryTimer::start("get_invite_stats");
        let result = sqlx::query_as::<_, InviteStatsEntity>(
            r#"
            SELECT total_codes, active_codes, used_codes, expired_codes, disabled_codes,
                   total_usages
            FROM get_invite_stats()
            "#,
        )
        .fetch_one(&self.pool)
        .await;
        timer.finish();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain::models::{ClientInfo, GenerateOptions, InviteCodeType};
    use sqlx::postgres::PgPoolOptions;
    use std::time::Duration;

    /// Pool whose connections are always refused.
    fn unreachable_repository() -> InviteCodeRepository {
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(500))
            .connect_lazy("postgres://nobody@127.0.0.1:1/none")
            .unwrap();
        InviteCodeRepository::new(pool)
    }

    #[tokio::test]
    async fn test_failed_writes_return_the_error() {
        let repository = unreachable_repository();
        let id = Uuid::new_v4();

        assert!(repository
            .update_status(id, InviteCodeStatusDb::Disabled)
            .await
            .is_err());
        assert!(repository.delete(id).await.is_err());

        let invite = InviteCode::new(
            "ABC".to_string(),
            &GenerateOptions::of_type(InviteCodeType::Single),
            "admin",
            Utc::now(),
        );
        let usage = InviteCodeUsage::new(&invite, "s-1", &ClientInfo::default(), Utc::now());
        assert!(repository.consume(invite.id, &usage).await.is_err());
    }
}
