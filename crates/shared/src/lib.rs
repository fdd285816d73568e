//! Shared utilities for the invite-code backend.
//!
//! This crate provides functionality used across the other crates:
//! - Invite code generation
//! - Admin password hashing with Argon2id
//! - Admin session records and signed session tokens

pub mod code;
pub mod password;
pub mod session;
