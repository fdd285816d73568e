//! Domain layer for the invite-code backend.
//!
//! This crate contains:
//! - Domain models (InviteCode, InviteCodeUsage, AdminUser)
//! - The storage traits both backends implement
//! - Business logic services (invite codes, admin accounts, CSV export)
//! - Domain error types

pub mod error;
pub mod models;
pub mod services;
pub mod store;

pub use error::{DomainError, ErrorKind};
