//! Invite code lifecycle: creation, validation, consumption and admin overrides.
//!
//! Runs unchanged on either backend; storage goes through [`InviteCodeStore`]
//! and the per-client remembered code through [`ClientMemory`].

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::error::DomainError;
use crate::models::{
    ClientInfo, GenerateOptions, InviteCode, InviteCodeStats, InviteCodeStatus, InviteCodeUsage,
    InviteCodeValidation, DEFAULT_CREATED_BY, MAX_CREATED_BY_CHARS, MAX_SESSION_ID_CHARS,
};
use crate::services::csv_export::render_invite_codes_csv;
use crate::store::{ClientMemory, InviteCodeStore};

/// Candidates tried before creation gives up.
pub const MAX_GENERATION_ATTEMPTS: u32 = 100;

/// Trimmed creator label, [`DEFAULT_CREATED_BY`] when blank.
fn creator_label(created_by: &str) -> Result<&str, DomainError> {
    match created_by.trim() {
        "" => Ok(DEFAULT_CREATED_BY),
        name if name.chars().count() > MAX_CREATED_BY_CHARS => Err(DomainError::InvalidInput(
            format!("createdBy must be at most {} characters", MAX_CREATED_BY_CHARS),
        )),
        name => Ok(name),
    }
}

/// Produces a candidate code from a body length and optional prefix.
pub type CodeGenerator = Arc<dyn Fn(usize, Option<&str>) -> String + Send + Sync>;

/// Business logic for invite codes on top of one storage backend.
#[derive(Clone)]
pub struct InviteCodeService {
    store: Arc<dyn InviteCodeStore>,
    client: Arc<dyn ClientMemory>,
    generator: CodeGenerator,
}

impl InviteCodeService {
    pub fn new(store: Arc<dyn InviteCodeStore>, client: Arc<dyn ClientMemory>) -> Self {
        Self::with_generator(store, client, Arc::new(shared::code::generate_random_code))
    }

    /// Uses `generator` instead of the random one.
    pub fn with_generator(
        store: Arc<dyn InviteCodeStore>,
        client: Arc<dyn ClientMemory>,
        generator: CodeGenerator,
    ) -> Self {
        Self {
            store,
            client,
            generator,
        }
    }

    /// The same service remembering codes in `client` instead.
    pub fn with_client(&self, client: Arc<dyn ClientMemory>) -> Self {
        Self {
            store: self.store.clone(),
            client,
            generator: self.generator.clone(),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Generates a code without checking or touching storage.
    pub fn generate_random_code(&self, length: usize, prefix: Option<&str>) -> String {
        (self.generator)(length, prefix)
    }

    /// Creates one `active` code that no stored code already uses.
    ///
    /// A blank `created_by` is recorded as [`DEFAULT_CREATED_BY`].
    pub async fn create_invite_code(
        &self,
        options: &GenerateOptions,
        created_by: &str,
    ) -> Result<InviteCode, DomainError> {
        options.validate()?;
        let created_by = creator_label(created_by)?;

        for attempt in 1..=MAX_GENERATION_ATTEMPTS {
            let candidate = self.generate_random_code(options.resolved_length(), options.prefix());
            if self.store.code_exists(&candidate).await? {
                continue;
            }

            let invite = InviteCode::new(candidate, options, created_by, Utc::now());
            match self.store.insert_invite_code(&invite).await {
                Ok(()) => {
                    info!(
                        code_id = %invite.id,
                        code_type = %invite.code_type,
                        max_uses = invite.max_uses,
                        created_by = %invite.created_by,
                        attempt,
                        "Invite code created"
                    );
                    return Ok(invite);
                }
                // Taken between the existence check and the insert.
                Err(DomainError::Conflict(_)) => continue,
                Err(e) => return Err(e),
            }
        }

        Err(DomainError::GenerationExhausted {
            attempts: MAX_GENERATION_ATTEMPTS,
        })
    }

    /// Creates up to `count` codes, skipping the ones that fail.
    pub async fn batch_create_invite_codes(
        &self,
        count: usize,
        options: &GenerateOptions,
        created_by: &str,
    ) -> Result<Vec<InviteCode>, DomainError> {
        options.validate()?;
        creator_label(created_by)?;

        let mut created = Vec::with_capacity(count);
        for index in 0..count {
            match self.create_invite_code(options, created_by).await {
                Ok(invite) => created.push(invite),
                Err(e) => warn!(index, error = %e, "Skipping invite code in batch"),
            }
        }

        info!(
            requested = count,
            created = created.len(),
            "Invite code batch finished"
        );
        Ok(created)
    }

    /// Validates `code`, persisting any lazy status correction.
    pub async fn validate_invite_code(
        &self,
        code: &str,
    ) -> Result<InviteCodeValidation, DomainError> {
        self.store.validate_invite_code(code, Utc::now()).await
    }

    /// Consumes one use of `code` for an assessment session.
    ///
    /// Returns false when the code is rejected or was used up concurrently.
    /// On success the code is also remembered as this client's own.
    pub async fn use_invite_code(
        &self,
        code: &str,
        session_id: &str,
        client: &ClientInfo,
    ) -> Result<bool, DomainError> {
        let session_chars = session_id.chars().count();
        if session_chars == 0 || session_chars > MAX_SESSION_ID_CHARS {
            return Err(DomainError::InvalidInput(format!(
                "sessionId must be 1-{} characters",
                MAX_SESSION_ID_CHARS
            )));
        }

        let validation = self.validate_invite_code(code).await?;
        let invite = match validation.code {
            Some(invite) if validation.valid => invite,
            _ => return Ok(false),
        };

        let usage = InviteCodeUsage::new(&invite, session_id, client, Utc::now());
        let Some(updated) = self.store.consume_invite_code(invite.id, &usage).await? else {
            info!(code_id = %invite.id, "Invite code no longer consumable at write time");
            return Ok(false);
        };

        info!(
            code_id = %updated.id,
            used_count = updated.used_count,
            max_uses = updated.max_uses,
            status = %updated.status,
            session_id = %session_id,
            "Invite code consumed"
        );

        if let Err(e) = self.client.remember_invite_code(&updated.code).await {
            warn!(error = %e, "Failed to remember consumed invite code");
        }

        Ok(true)
    }

    /// All codes, newest first.
    pub async fn get_all_invite_codes(&self) -> Result<Vec<InviteCode>, DomainError> {
        self.store.list_invite_codes().await
    }

    pub async fn get_invite_code(&self, id: Uuid) -> Result<InviteCode, DomainError> {
        self.store
            .find_invite_code(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Invite code {} not found", id)))
    }

    pub async fn get_invite_code_stats(&self) -> Result<InviteCodeStats, DomainError> {
        self.store.invite_code_stats().await
    }

    /// Admin override of the status. False if the id is unknown.
    pub async fn update_invite_code_status(
        &self,
        id: Uuid,
        status: InviteCodeStatus,
    ) -> Result<bool, DomainError> {
        let updated = self.store.set_invite_code_status(id, status).await?;
        if updated {
            info!(code_id = %id, status = %status, "Invite code status updated");
        }
        Ok(updated)
    }

    pub async fn delete_invite_code(&self, id: Uuid) -> Result<bool, DomainError> {
        let deleted = self.store.delete_invite_code(id).await?;
        if deleted {
            info!(code_id = %id, "Invite code deleted");
        }
        Ok(deleted)
    }

    /// Usage history of one code, newest first.
    pub async fn get_invite_code_usages(
        &self,
        code_id: Uuid,
    ) -> Result<Vec<InviteCodeUsage>, DomainError> {
        self.store.list_usages_for_code(code_id).await
    }

    /// All codes as CSV, newest first.
    pub async fn export_invite_codes_csv(&self) -> Result<String, DomainError> {
        let codes = self.get_all_invite_codes().await?;
        Ok(render_invite_codes_csv(&codes))
    }

    pub async fn get_user_invite_code(&self) -> Result<Option<String>, DomainError> {
        self.client.remembered_invite_code().await
    }

    pub async fn save_user_invite_code(&self, code: &str) -> Result<(), DomainError> {
        self.client.remember_invite_code(code).await
    }

    /// True if this client remembers a code that still validates here.
    pub async fn has_valid_user_invite_code(&self) -> Result<bool, DomainError> {
        match self.get_user_invite_code().await? {
            Some(code) => Ok(self.validate_invite_code(&code).await?.valid),
            None => Ok(false),
        }
    }
}
