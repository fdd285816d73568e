//! Admin account domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

/// Role of an admin account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdminRole {
    SuperAdmin,
    Admin,
}

impl AdminRole {
    /// Role for a new account given how many accounts already exist.
    ///
    /// The first account ever created is the super-admin.
    pub fn for_new_account(existing_admins: i64) -> Self {
        if existing_admins == 0 {
            AdminRole::SuperAdmin
        } else {
            AdminRole::Admin
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AdminRole::SuperAdmin => "super-admin",
            AdminRole::Admin => "admin",
        }
    }
}

impl FromStr for AdminRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super-admin" => Ok(AdminRole::SuperAdmin),
            "admin" => Ok(AdminRole::Admin),
            _ => Err(format!("Unknown admin role: {}", s)),
        }
    }
}

impl std::fmt::Display for AdminRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_active() -> bool {
    true
}

/// Stored admin account, including its password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub role: AdminRole,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

/// Admin account as shown to clients (no credential material).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminProfile {
    pub id: Uuid,
    pub username: String,
    pub role: AdminRole,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<&AdminUser> for AdminProfile {
    fn from(admin: &AdminUser) -> Self {
        Self {
            id: admin.id,
            username: admin.username.clone(),
            role: admin.role,
            created_at: admin.created_at,
            last_login_at: admin.last_login_at,
        }
    }
}

/// Credentials for creating an admin or logging in.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AdminCredentials {
    #[validate(length(min = 3, max = 64, message = "Username must be 3-64 characters"))]
    #[validate(regex(
        path = *USERNAME_REGEX,
        message = "Username may only contain letters, digits, '.', '_' and '-'"
    ))]
    pub username: String,

    #[validate(length(min = 6, max = 128, message = "Password must be 6-128 characters"))]
    pub password: String,
}

lazy_static::lazy_static! {
    static ref USERNAME_REGEX: regex::Regex =
        regex::Regex::new(r"^[A-Za-z0-9_.\-]+$").unwrap();
}
