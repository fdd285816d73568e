//! Runtime choice between the local and the remote storage backend.
//!
//! Both backends run the same domain services; the selector only decides
//! which instance an operation goes to. Values that belong to one client
//! (its remembered invite code) or one admin (the stored session) always go
//! to local storage, each under its own scope.

use std::sync::Arc;

use domain::models::{
    AdminUser, ClientInfo, GenerateOptions, InviteCode, InviteCodeStats, InviteCodeStatus,
    InviteCodeUsage, InviteCodeValidation,
};
use domain::services::{AdminAccountService, InviteCodeService};
use domain::store::ClientMemory;
use domain::DomainError;
use persistence::{KeyValueStore, LocalClientState, LocalStore, PgStore};
use shared::session::AdminSession;
use sqlx::PgPool;
use uuid::Uuid;

/// The services of one backend.
#[derive(Clone)]
pub struct Backend {
    pub invite_codes: InviteCodeService,
    pub admins: AdminAccountService,
}

impl Backend {
    /// Backend storing everything in the client-local key-value store.
    pub fn local(kv: Arc<dyn KeyValueStore>, client: Arc<dyn ClientMemory>) -> Self {
        let store = Arc::new(LocalStore::new(kv));
        Self {
            invite_codes: InviteCodeService::new(store.clone(), client),
            admins: AdminAccountService::new(store),
        }
    }

    /// Backend storing invite codes and admins in PostgreSQL.
    pub fn remote(pool: PgPool, client: Arc<dyn ClientMemory>) -> Self {
        let store = Arc::new(PgStore::new(pool));
        Self {
            invite_codes: InviteCodeService::new(store.clone(), client),
            admins: AdminAccountService::new(store),
        }
    }
}

/// Routes every invite-code and admin operation to the active backend.
#[derive(Clone)]
pub struct BackendSelector {
    remote_configured: bool,
    local: Backend,
    remote: Option<Backend>,
    kv: Arc<dyn KeyValueStore>,
}

impl BackendSelector {
    pub fn new(
        remote_configured: bool,
        local: Backend,
        remote: Option<Backend>,
        kv: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            remote_configured,
            local,
            remote,
            kv,
        }
    }

    /// Builds the selector on one key-value store.
    ///
    /// `remote_configured` with `pool: None` means the database was
    /// configured but could not be reached; operations then fail with
    /// `BackendUnavailable` instead of silently using local storage.
    pub fn from_parts(
        kv: Arc<dyn KeyValueStore>,
        remote_configured: bool,
        pool: Option<PgPool>,
    ) -> Self {
        // Unscoped: every client-facing call rebinds to a scoped state.
        let unscoped: Arc<dyn ClientMemory> = Arc::new(LocalClientState::new(kv.clone()));
        let local = Backend::local(kv.clone(), unscoped.clone());
        let remote = pool.map(|pool| Backend::remote(pool, unscoped));
        Self::new(remote_configured, local, remote, kv)
    }

    fn scope(&self, id: Uuid) -> Arc<dyn ClientMemory> {
        Arc::new(LocalClientState::scoped(self.kv.clone(), &id.to_string()))
    }

    pub fn remote_configured(&self) -> bool {
        self.remote_configured
    }

    /// `"remote"` when a database is configured, `"local"` otherwise.
    pub fn backend_type(&self) -> &'static str {
        if self.remote_configured {
            "remote"
        } else {
            "local"
        }
    }

    fn active(&self) -> Result<&Backend, DomainError> {
        if !self.remote_configured {
            return Ok(&self.local);
        }
        self.remote.as_ref().ok_or_else(|| {
            DomainError::BackendUnavailable(
                "Remote database is configured but not connected".into(),
            )
        })
    }

    fn invite_codes(&self) -> Result<&InviteCodeService, DomainError> {
        Ok(&self.active()?.invite_codes)
    }

    fn admins(&self) -> Result<&AdminAccountService, DomainError> {
        Ok(&self.active()?.admins)
    }

    // Invite codes

    pub fn generate_random_code(&self, length: usize, prefix: Option<&str>) -> String {
        self.local.invite_codes.generate_random_code(length, prefix)
    }

    pub async fn create_invite_code(
        &self,
        options: &GenerateOptions,
        created_by: &str,
    ) -> Result<InviteCode, DomainError> {
        self.invite_codes()?
            .create_invite_code(options, created_by)
            .await
    }

    pub async fn batch_create_invite_codes(
        &self,
        count: usize,
        options: &GenerateOptions,
        created_by: &str,
    ) -> Result<Vec<InviteCode>, DomainError> {
        self.invite_codes()?
            .batch_create_invite_codes(count, options, created_by)
            .await
    }

    pub async fn validate_invite_code(
        &self,
        code: &str,
    ) -> Result<InviteCodeValidation, DomainError> {
        self.invite_codes()?.validate_invite_code(code).await
    }

    /// Consumes `code`; on success it becomes `client_id`'s remembered code.
    pub async fn use_invite_code(
        &self,
        client_id: Uuid,
        code: &str,
        session_id: &str,
        client: &ClientInfo,
    ) -> Result<bool, DomainError> {
        self.invite_codes()?
            .with_client(self.scope(client_id))
            .use_invite_code(code, session_id, client)
            .await
    }

    pub async fn get_all_invite_codes(&self) -> Result<Vec<InviteCode>, DomainError> {
        self.invite_codes()?.get_all_invite_codes().await
    }

    pub async fn get_invite_code(&self, id: Uuid) -> Result<InviteCode, DomainError> {
        self.invite_codes()?.get_invite_code(id).await
    }

    pub async fn get_invite_code_stats(&self) -> Result<InviteCodeStats, DomainError> {
        self.invite_codes()?.get_invite_code_stats().await
    }

    pub async fn update_invite_code_status(
        &self,
        id: Uuid,
        status: InviteCodeStatus,
    ) -> Result<bool, DomainError> {
        self.invite_codes()?
            .update_invite_code_status(id, status)
            .await
    }

    pub async fn delete_invite_code(&self, id: Uuid) -> Result<bool, DomainError> {
        self.invite_codes()?.delete_invite_code(id).await
    }

    pub async fn get_invite_code_usages(
        &self,
        code_id: Uuid,
    ) -> Result<Vec<InviteCodeUsage>, DomainError> {
        self.invite_codes()?.get_invite_code_usages(code_id).await
    }

    pub async fn export_invite_codes_csv(&self) -> Result<String, DomainError> {
        self.invite_codes()?.export_invite_codes_csv().await
    }

    // Admin accounts

    pub async fn admin_login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<AdminUser>, DomainError> {
        self.admins()?.admin_login(username, password).await
    }

    pub async fn create_admin_user(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AdminUser, DomainError> {
        self.admins()?.create_admin_user(username, password).await
    }

    pub async fn needs_admin_initialization(&self) -> Result<bool, DomainError> {
        self.admins()?.needs_admin_initialization().await
    }

    // Per-client values in local storage, never routed to the remote backend

    fn local_for(&self, client_id: Uuid) -> InviteCodeService {
        self.local.invite_codes.with_client(self.scope(client_id))
    }

    pub async fn get_user_invite_code(
        &self,
        client_id: Uuid,
    ) -> Result<Option<String>, DomainError> {
        self.local_for(client_id).get_user_invite_code().await
    }

    pub async fn save_user_invite_code(
        &self,
        client_id: Uuid,
        code: &str,
    ) -> Result<(), DomainError> {
        self.local_for(client_id).save_user_invite_code(code).await
    }

    /// Checks the remembered code against the local backend.
    pub async fn has_valid_user_invite_code(
        &self,
        client_id: Uuid,
    ) -> Result<bool, DomainError> {
        self.local_for(client_id).has_valid_user_invite_code().await
    }

    /// Stores `session` in the slot of its admin.
    pub async fn save_admin_session(&self, session: &AdminSession) -> Result<(), DomainError> {
        self.scope(session.admin_id).save_admin_session(session).await
    }

    pub async fn current_admin_session(
        &self,
        admin_id: Uuid,
    ) -> Result<Option<AdminSession>, DomainError> {
        self.scope(admin_id).admin_session().await
    }

    pub async fn clear_admin_session(&self, admin_id: Uuid) -> Result<(), DomainError> {
        self.scope(admin_id).clear_admin_session().await
    }
}
