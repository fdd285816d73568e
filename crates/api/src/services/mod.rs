//! Application services.

pub mod backend_selector;

pub use backend_selector::{Backend, BackendSelector};
