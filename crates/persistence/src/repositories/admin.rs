//! Admin account repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use domain::models::AdminUser;

use crate::entities::{AdminEntity, AdminRoleDb};
use crate::metrics::QueryTimer;

/// Repository for admin accounts.
#[derive(Clone)]
pub struct AdminRepository {
    pool: PgPool,
}

impl AdminRepository {
    /// Creates a new AdminRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::start("count_admins");
        let result = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM admins")
            .fetch_one(&self.pool)
            .await;
        timer.finish();
        result
    }

    /// Find admin by username.
    pub async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AdminEntity>, sqlx::Error> {
        let timer = QueryTimer::start("find_admin_by_username");
        let result = sqlx::query_as::<_, AdminEntity>(
            r#"
            SELECT id, username, password_hash, role, created_at, last_login_at, is_active
            FROM admins
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await;
        timer.finish();
        result
    }

    pub async fn insert(&self, admin: &AdminUser) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::start("insert_admin");
        let result = sqlx::query(
            r#"
            INSERT INTO admins
                (id, username, password_hash, role, created_at, last_login_at, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(admin.id)
        .bind(&admin.username)
        .bind(&admin.password_hash)
        .bind(AdminRoleDb::from(admin.role))
        .bind(admin.created_at)
        .bind(admin.last_login_at)
        .bind(admin.is_active)
        .execute(&self.pool)
        .await;
        timer.finish();
        result.map(|_| ())
    }

    /// Update last_login_at.
    pub async fn update_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::start("update_admin_last_login");
        let result = sqlx::query("UPDATE admins SET last_login_at = $1 WHERE id = $2")
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await;
        timer.finish();
        result.map(|r| r.rows_affected())
    }
}
