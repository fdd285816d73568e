//! Per-client values: the remembered invite code and the admin session.
//!
//! An unscoped state owns the bare keys, which suits a store that belongs to
//! a single client. A server holding values for many clients gives each one
//! its own scope; the scope is appended to both keys.

use std::sync::Arc;

use domain::store::ClientMemory;
use domain::DomainError;
use shared::session::AdminSession;
use tracing::{debug, warn};

use super::kv::KeyValueStore;

/// Key of the invite code this client last consumed.
pub const USER_INVITE_CODE_KEY: &str = "sri_user_invite_code";

/// Key of the current admin session.
pub const ADMIN_SESSION_KEY: &str = "sri_admin_session";

/// [`ClientMemory`] kept in client-local storage.
pub struct LocalClientState {
    kv: Arc<dyn KeyValueStore>,
    code_key: String,
    session_key: String,
}

impl LocalClientState {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            code_key: USER_INVITE_CODE_KEY.to_string(),
            session_key: ADMIN_SESSION_KEY.to_string(),
        }
    }

    /// State of one client among many, stored under `<key>.<scope>`.
    ///
    /// `scope` becomes part of a file name; callers pass identifiers they
    /// generated or parsed themselves (UUIDs), never raw request text.
    pub fn scoped(kv: Arc<dyn KeyValueStore>, scope: &str) -> Self {
        Self {
            kv,
            code_key: format!("{}.{}", USER_INVITE_CODE_KEY, scope),
            session_key: format!("{}.{}", ADMIN_SESSION_KEY, scope),
        }
    }
}

#[async_trait::async_trait]
impl ClientMemory for LocalClientState {
    async fn remembered_invite_code(&self) -> Result<Option<String>, DomainError> {
        self.kv.get(&self.code_key).await
    }

    async fn remember_invite_code(&self, code: &str) -> Result<(), DomainError> {
        self.kv.set(&self.code_key, code).await
    }

    async fn admin_session(&self) -> Result<Option<AdminSession>, DomainError> {
        let Some(raw) = self.kv.get(&self.session_key).await? else {
            return Ok(None);
        };

        let session = match serde_json::from_str::<AdminSession>(&raw) {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Discarding unreadable admin session");
                self.kv.remove(&self.session_key).await?;
                return Ok(None);
            }
        };

        if session.is_expired() {
            debug!(admin_id = %session.admin_id, "Discarding expired admin session");
            self.kv.remove(&self.session_key).await?;
            return Ok(None);
        }

        Ok(Some(session))
    }

    async fn save_admin_session(&self, session: &AdminSession) -> Result<(), DomainError> {
        let raw = serde_json::to_string(session).map_err(|e| {
            DomainError::PersistenceFailure(format!("Failed to serialize admin session: {}", e))
        })?;
        self.kv.set(&self.session_key, &raw).await
    }

    async fn clear_admin_session(&self) -> Result<(), DomainError> {
        self.kv.remove(&self.session_key).await
    }
}
