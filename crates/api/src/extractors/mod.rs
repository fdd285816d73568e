//! Custom Axum extractors.

pub mod admin_auth;
pub mod client_id;
pub mod client_meta;

pub use admin_auth::AdminAuth;
pub use client_id::ClientId;
pub use client_meta::ClientMeta;
