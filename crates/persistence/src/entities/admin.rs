//! Admin account entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{AdminRole, AdminUser};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for admin_role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "admin_role")]
pub enum AdminRoleDb {
    #[sqlx(rename = "super-admin")]
    SuperAdmin,
    #[sqlx(rename = "admin")]
    Admin,
}

impl From<AdminRoleDb> for AdminRole {
    fn from(db_role: AdminRoleDb) -> Self {
        match db_role {
            AdminRoleDb::SuperAdmin => AdminRole::SuperAdmin,
            AdminRoleDb::Admin => AdminRole::Admin,
        }
    }
}

impl From<AdminRole> for AdminRoleDb {
    fn from(role: AdminRole) -> Self {
        match role {
            AdminRole::SuperAdmin => AdminRoleDb::SuperAdmin,
            AdminRole::Admin => AdminRoleDb::Admin,
        }
    }
}

/// Database row mapping for the admins table.
#[derive(Debug, Clone, FromRow)]
pub struct AdminEntity {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub role: AdminRoleDb,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl From<AdminEntity> for AdminUser {
    fn from(entity: AdminEntity) -> Self {
        Self {
            id: entity.id,
            username: entity.username,
            password_hash: entity.password_hash,
            role: entity.role.into(),
            created_at: entity.created_at,
            last_login_at: entity.last_login_at,
            is_active: entity.is_active,
        }
    }
}
