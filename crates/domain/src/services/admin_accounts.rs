//! Admin account registration and login.

use chrono::Utc;
use shared::password::{hash_password, verify_password, PasswordError};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::error::DomainError;
use crate::models::{AdminCredentials, AdminRole, AdminUser};
use crate::store::AdminStore;

#[derive(Clone)]
pub struct AdminAccountService {
    store: Arc<dyn AdminStore>,
}

impl AdminAccountService {
    pub fn new(store: Arc<dyn AdminStore>) -> Self {
        Self { store }
    }

    /// Registers an admin account.
    ///
    /// The role is decided by the number of accounts that exist right now:
    /// the first one becomes `super-admin`, later ones `admin`.
    pub async fn create_admin_user(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AdminUser, DomainError> {
        let credentials = AdminCredentials {
            username: username.to_string(),
            password: password.to_string(),
        };
        credentials.validate()?;

        if self.store.find_admin_by_username(username).await?.is_some() {
            return Err(DomainError::Conflict(format!(
                "Admin username '{}' is already taken",
                username
            )));
        }

        let password_hash = hash_password(password)?;
        let existing = self.store.count_admins().await?;

        let admin = AdminUser {
            id: Uuid::new_v4(),
            username: credentials.username,
            password_hash,
            role: AdminRole::for_new_account(existing),
            created_at: Utc::now(),
            last_login_at: None,
            is_active: true,
        };
        self.store.insert_admin(&admin).await?;

        info!(
            admin_id = %admin.id,
            username = %admin.username,
            role = %admin.role,
            "Admin account created"
        );
        Ok(admin)
    }

    /// Checks credentials and records the login time.
    ///
    /// Unknown usernames, wrong passwords and disabled accounts all yield
    /// `None`, so callers cannot tell them apart.
    pub async fn admin_login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<AdminUser>, DomainError> {
        let Some(mut admin) = self.store.find_admin_by_username(username).await? else {
            return Ok(None);
        };

        if !admin.is_active {
            return Ok(None);
        }

        match verify_password(password, &admin.password_hash) {
            Ok(true) => {}
            Ok(false) => return Ok(None),
            Err(PasswordError::LegacyObfuscation) | Err(PasswordError::InvalidHashFormat) => {
                warn!(
                    admin_id = %admin.id,
                    "Admin account has an unusable password hash; reset required"
                );
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        }

        let now = Utc::now();
        self.store.record_admin_login(admin.id, now).await?;
        admin.last_login_at = Some(now);

        info!(admin_id = %admin.id, username = %admin.username, "Admin logged in");
        Ok(Some(admin))
    }

    /// True while no admin account exists.
    pub async fn needs_admin_initialization(&self) -> Result<bool, DomainError> {
        Ok(self.store.count_admins().await? == 0)
    }
}
