//! HTTP route handlers.

pub mod admin;
pub mod admin_invite_codes;
pub mod health;
pub mod invite_codes;
