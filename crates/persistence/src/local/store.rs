//! Local backend: every invite code, usage and admin account in one JSON blob.
//!
//! Each operation loads the blob, works on the loaded value and, for writes,
//! saves it back. Load-modify-save cycles are serialized by a mutex, so two
//! requests in this process cannot overwrite each other's changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use domain::models::{
    AdminUser, InviteCode, InviteCodeStats, InviteCodeStatus, InviteCodeUsage,
};
use domain::store::{AdminStore, InviteCodeStore};
use domain::DomainError;

use super::kv::KeyValueStore;

/// Key the dataset blob is stored under.
pub const ADMIN_DATA_KEY: &str = "sri_admin_data";

/// Schema tag written into every saved blob.
pub const DATASET_VERSION: &str = "1.0.0";

/// The persisted blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDataset {
    #[serde(default)]
    pub invite_codes: Vec<InviteCode>,
    #[serde(default)]
    pub usages: Vec<InviteCodeUsage>,
    #[serde(default)]
    pub admins: Vec<AdminUser>,
    pub version: String,
}

impl Default for AdminDataset {
    fn default() -> Self {
        Self {
            invite_codes: Vec::new(),
            usages: Vec::new(),
            admins: Vec::new(),
            version: DATASET_VERSION.to_string(),
        }
    }
}

impl AdminDataset {
    fn invite_mut(&mut self, id: Uuid) -> Option<&mut InviteCode> {
        self.invite_codes.iter_mut().find(|c| c.id == id)
    }
}

/// Invite code and admin storage on top of a [`KeyValueStore`].
pub struct LocalStore {
    kv: Arc<dyn KeyValueStore>,
    lock: Mutex<()>,
}

impl LocalStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            lock: Mutex::new(()),
        }
    }

    /// Loads the blob. A missing or unreadable blob is the empty dataset.
    pub async fn load(&self) -> Result<AdminDataset, DomainError> {
        let Some(raw) = self.kv.get(ADMIN_DATA_KEY).await? else {
            return Ok(AdminDataset::default());
        };

        match serde_json::from_str::<AdminDataset>(&raw) {
            Ok(dataset) => {
                if dataset.version != DATASET_VERSION {
                    warn!(
                        version = %dataset.version,
                        "Loaded admin dataset with unexpected version"
                    );
                }
                Ok(dataset)
            }
            Err(e) => {
                warn!(error = %e, "Admin dataset is corrupt; starting from an empty dataset");
                Ok(AdminDataset::default())
            }
        }
    }

    async fn save(&self, dataset: &AdminDataset) -> Result<(), DomainError> {
        let mut dataset = dataset.clone();
        dataset.version = DATASET_VERSION.to_string();
        let raw = serde_json::to_string(&dataset).map_err(|e| {
            DomainError::PersistenceFailure(format!("Failed to serialize admin dataset: {}", e))
        })?;
        self.kv.set(ADMIN_DATA_KEY, &raw).await
    }

    async fn read(&self) -> Result<AdminDataset, DomainError> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    /// Runs `mutate` on the loaded blob and saves it if `mutate` says so.
    async fn modify<T: Send>(
        &self,
        mutate: impl FnOnce(&mut AdminDataset) -> Result<(T, bool), DomainError> + Send,
    ) -> Result<T, DomainError> {
        let _guard = self.lock.lock().await;
        let mut dataset = self.load().await?;
        let (result, changed) = mutate(&mut dataset)?;
        if changed {
            self.save(&dataset).await?;
        }
        Ok(result)
    }
}

#[async_trait::async_trait]
impl InviteCodeStore for LocalStore {
    fn backend_name(&self) -> &'static str {
        "local"
    }

    async fn code_exists(&self, code: &str) -> Result<bool, DomainError> {
        Ok(self.read().await?.invite_codes.iter().any(|c| c.code == code))
    }

    async fn insert_invite_code(&self, invite: &InviteCode) -> Result<(), DomainError> {
        let invite = invite.clone();
        self.modify(move |data| {
            if data.invite_codes.iter().any(|c| c.code == invite.code) {
                return Err(DomainError::Conflict(format!(
                    "Invite code {} already exists",
                    invite.code
                )));
            }
            data.invite_codes.push(invite);
            Ok(((), true))
        })
        .await
    }

    async fn find_invite_code(&self, id: Uuid) -> Result<Option<InviteCode>, DomainError> {
        Ok(self.read().await?.invite_codes.into_iter().find(|c| c.id == id))
    }

    async fn find_invite_code_by_code(
        &self,
        code: &str,
    ) -> Result<Option<InviteCode>, DomainError> {
        Ok(self
            .read()
            .await?
            .invite_codes
            .into_iter()
            .find(|c| c.code == code))
    }

    async fn list_invite_codes(&self) -> Result<Vec<InviteCode>, DomainError> {
        let mut codes = self.read().await?.invite_codes;
        codes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(codes)
    }

    async fn set_invite_code_status(
        &self,
        id: Uuid,
        status: InviteCodeStatus,
    ) -> Result<bool, DomainError> {
        self.modify(move |data| match data.invite_mut(id) {
            Some(invite) => {
                invite.status = status;
                Ok((true, true))
            }
            None => Ok((false, false)),
        })
        .await
    }

    async fn delete_invite_code(&self, id: Uuid) -> Result<bool, DomainError> {
        self.modify(move |data| {
            let before = data.invite_codes.len();
            data.invite_codes.retain(|c| c.id != id);
            let removed = data.invite_codes.len() != before;
            Ok((removed, removed))
        })
        .await
    }

    async fn consume_invite_code(
        &self,
        id: Uuid,
        usage: &InviteCodeUsage,
    ) -> Result<Option<InviteCode>, DomainError> {
        let usage = usage.clone();
        self.modify(move |data| {
            let Some(invite) = data.invite_mut(id) else {
                return Ok((None, false));
            };
            if !invite.record_use(usage.used_at) {
                return Ok((None, false));
            }
            let updated = invite.clone();
            data.usages.push(usage);
            Ok((Some(updated), true))
        })
        .await
    }

    async fn list_usages_for_code(
        &self,
        code_id: Uuid,
    ) -> Result<Vec<InviteCodeUsage>, DomainError> {
        let mut usages: Vec<InviteCodeUsage> = self
            .read()
            .await?
            .usages
            .into_iter()
            .filter(|u| u.code_id == code_id)
            .collect();
        usages.sort_by(|a, b| b.used_at.cmp(&a.used_at));
        Ok(usages)
    }

    async fn invite_code_stats(&self) -> Result<InviteCodeStats, DomainError> {
        let data = self.read().await?;
        Ok(InviteCodeStats::from_snapshot(&data.invite_codes, &data.usages))
    }
}

#[async_trait::async_trait]
impl AdminStore for LocalStore {
    async fn count_admins(&self) -> Result<i64, DomainError> {
        Ok(self.read().await?.admins.len() as i64)
    }

    async fn find_admin_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AdminUser>, DomainError> {
        Ok(self
            .read()
            .await?
            .admins
            .into_iter()
            .find(|a| a.username == username))
    }

    async fn insert_admin(&self, admin: &AdminUser) -> Result<(), DomainError> {
        let admin = admin.clone();
        self.modify(move |data| {
            if data.admins.iter().any(|a| a.username == admin.username) {
                return Err(DomainError::Conflict(format!(
                    "Admin username '{}' is already taken",
                    admin.username
                )));
            }
            data.admins.push(admin);
            Ok(((), true))
        })
        .await
    }

    async fn record_admin_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), DomainError> {
        self.modify(move |data| {
            match data.admins.iter_mut().find(|a| a.id == id) {
                Some(admin) => {
                    admin.last_login_at = Some(at);
                    Ok(((), true))
                }
                None => Err(DomainError::NotFound(format!("Admin {} not found", id))),
            }
        })
        .await
    }
}
