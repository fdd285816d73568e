//! Repository implementations for database operations.

pub mod admin;
pub mod invite_code;

pub use admin::AdminRepository;
pub use invite_code::InviteCodeRepository;
