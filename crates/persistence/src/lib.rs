//! Persistence layer for the invite-code backend.
//!
//! This crate contains:
//! - The local backend (JSON blob in a client-local key-value store)
//! - The remote backend (PostgreSQL: pool, entities, repositories, migrations)

pub mod db;
pub mod entities;
pub mod local;
pub mod metrics;
pub mod postgres;
pub mod repositories;

pub use local::{
    FileKeyValueStore, KeyValueStore, LocalClientState, LocalStore, MemoryKeyValueStore,
};
pub use postgres::{db_error, PgStore};
