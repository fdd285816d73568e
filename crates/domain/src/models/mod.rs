//! Domain models for the invite-code backend.

pub mod admin_user;
pub mod invite_code;

pub use admin_user::{AdminCredentials, AdminProfile, AdminRole, AdminUser};
pub use invite_code::{
    ClientInfo, GenerateOptions, InviteCode, InviteCodeStats, InviteCodeStatus, InviteCodeType,
    InviteCodeUsage, InviteCodeValidation, Verdict, DEFAULT_CREATED_BY, MAX_CREATED_BY_CHARS,
    MAX_SESSION_ID_CHARS, RECENT_USAGE_LIMIT, UNLIMITED_USES,
};
