//! Client-local backend.
//!
//! Everything lives in a [`KeyValueStore`] under three fixed keys: the admin
//! dataset blob, this client's remembered invite code and the current admin
//! session.

pub mod client;
pub mod kv;
pub mod store;

pub use client::{LocalClientState, ADMIN_SESSION_KEY, USER_INVITE_CODE_KEY};
pub use kv::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use store::{AdminDataset, LocalStore, ADMIN_DATA_KEY, DATASET_VERSION};
