//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod admin;
pub mod invite_code;

pub use admin::{AdminEntity, AdminRoleDb};
pub use invite_code::{
    CodeValidationEntity, InviteCodeEntity, InviteCodeStatusDb, InviteCodeTypeDb,
    InviteCodeUsageEntity, InviteStatsEntity,
};
