//! Invite code entities (database row mappings).

use chrono::{DateTime, Utc};
use domain::models::{
    InviteCode, InviteCodeStats, InviteCodeStatus, InviteCodeType, InviteCodeUsage,
};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for invite_code_type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "invite_code_type", rename_all = "lowercase")]
pub enum InviteCodeTypeDb {
    Single,
    Multiple,
    Unlimited,
}

impl From<InviteCodeTypeDb> for InviteCodeType {
    fn from(db_type: InviteCodeTypeDb) -> Self {
        match db_type {
            InviteCodeTypeDb::Single => InviteCodeType::Single,
            InviteCodeTypeDb::Multiple => InviteCodeType::Multiple,
            InviteCodeTypeDb::Unlimited => InviteCodeType::Unlimited,
        }
    }
}

impl From<InviteCodeType> for InviteCodeTypeDb {
    fn from(code_type: InviteCodeType) -> Self {
        match code_type {
            InviteCodeType::Single => InviteCodeTypeDb::Single,
            InviteCodeType::Multiple => InviteCodeTypeDb::Multiple,
            InviteCodeType::Unlimited => InviteCodeTypeDb::Unlimited,
        }
    }
}

/// Database enum for invite_code_status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "invite_code_status", rename_all = "lowercase")]
pub enum InviteCodeStatusDb {
    Active,
    Used,
    Expired,
    Disabled,
}

impl From<InviteCodeStatusDb> for InviteCodeStatus {
    fn from(db_status: InviteCodeStatusDb) -> Self {
        match db_status {
            InviteCodeStatusDb::Active => InviteCodeStatus::Active,
            InviteCodeStatusDb::Used => InviteCodeStatus::Used,
            InviteCodeStatusDb::Expired => InviteCodeStatus::Expired,
            InviteCodeStatusDb::Disabled => InviteCodeStatus::Disabled,
        }
    }
}

impl From<InviteCodeStatus> for InviteCodeStatusDb {
    fn from(status: InviteCodeStatus) -> Self {
        match status {
            InviteCodeStatus::Active => InviteCodeStatusDb::Active,
            InviteCodeStatus::Used => InviteCodeStatusDb::Used,
            InviteCodeStatus::Expired => InviteCodeStatusDb::Expired,
            InviteCodeStatus::Disabled => InviteCodeStatusDb::Disabled,
        }
    }
}

/// Database row mapping for the invite_codes table.
#[derive(Debug, Clone, FromRow)]
pub struct InviteCodeEntity {
    pub id: Uuid,
    pub code: String,
    #[sqlx(rename = "type")]
    pub code_type: InviteCodeTypeDb,
    pub max_uses: i32,
    pub used_count: i32,
    pub status: InviteCodeStatusDb,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_by: String,
    pub note: Option<String>,
    pub metadata: serde_json::Value,
}

impl From<InviteCodeEntity> for InviteCode {
    fn from(entity: InviteCodeEntity) -> Self {
        Self {
            id: entity.id,
            code: entity.code,
            code_type: entity.code_type.into(),
            max_uses: entity.max_uses,
            used_count: entity.used_count,
            status: entity.status.into(),
            created_at: entity.created_at,
            expires_at: entity.expires_at,
            created_by: entity.created_by,
            note: entity.note,
            metadata: entity.metadata,
        }
    }
}

/// Database row mapping for the invite_code_usages table.
#[derive(Debug, Clone, FromRow)]
pub struct InviteCodeUsageEntity {
    pub id: Uuid,
    pub code_id: Uuid,
    pub code: String,
    pub used_at: DateTime<Utc>,
    pub session_id: String,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

impl From<InviteCodeUsageEntity> for InviteCodeUsage {
    fn from(entity: InviteCodeUsageEntity) -> Self {
        Self {
            id: entity.id,
            code_id: entity.code_id,
            code: entity.code,
            used_at: entity.used_at,
            session_id: entity.session_id,
            user_agent: entity.user_agent,
            ip_address: entity.ip_address,
        }
    }
}

/// Row returned by the validate_invite_code() function.
#[derive(Debug, Clone, FromRow)]
pub struct CodeValidationEntity {
    pub valid: bool,
    pub code_id: Option<Uuid>,
    pub reason: Option<String>,
}

/// Row returned by the get_invite_stats() function.
#[derive(Debug, Clone, FromRow)]
pub struct InviteStatsEntity {
    pub total_codes: i64,
    pub active_codes: i64,
    pub used_codes: i64,
    pub expired_codes: i64,
    pub disabled_codes: i64,
    pub total_usages: i64,
}

impl InviteStatsEntity {
    pub fn into_stats(self, recent_usages: Vec<InviteCodeUsage>) -> InviteCodeStats {
        InviteCodeStats {
            total_codes: self.total_codes,
            active_codes: self.active_codes,
            used_codes: self.used_codes,
            expired_codes: self.expired_codes,
            disabled_codes: self.disabled_codes,
            total_usages: self.total_usages,
            recent_usages,
        }
    }
}
