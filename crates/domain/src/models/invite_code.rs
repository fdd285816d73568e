//! Invite code domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use shared::code::DEFAULT_CODE_LENGTH;

/// `max_uses` value meaning "no ceiling".
pub const UNLIMITED_USES: i32 = -1;

/// Label recorded as creator when none is supplied.
pub const DEFAULT_CREATED_BY: &str = "admin";

/// Longest accepted creator label, in characters.
pub const MAX_CREATED_BY_CHARS: usize = 64;

/// Longest accepted assessment session id, in characters.
pub const MAX_SESSION_ID_CHARS: usize = 255;

/// Number of usages returned in [`InviteCodeStats::recent_usages`].
pub const RECENT_USAGE_LIMIT: usize = 10;

/// Usage policy of an invite code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InviteCodeType {
    Single,
    Multiple,
    Unlimited,
}

impl InviteCodeType {
    /// Ceiling applied when the creator does not pick one.
    pub fn default_max_uses(self) -> i32 {
        match self {
            InviteCodeType::Single => 1,
            InviteCodeType::Multiple => 10,
            InviteCodeType::Unlimited => UNLIMITED_USES,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InviteCodeType::Single => "single",
            InviteCodeType::Multiple => "multiple",
            InviteCodeType::Unlimited => "unlimited",
        }
    }
}

impl FromStr for InviteCodeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" => Ok(InviteCodeType::Single),
            "multiple" => Ok(InviteCodeType::Multiple),
            "unlimited" => Ok(InviteCodeType::Unlimited),
            _ => Err(format!("Unknown invite code type: {}", s)),
        }
    }
}

impl std::fmt::Display for InviteCodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of an invite code.
///
/// `active -> expired` and `active -> used` happen automatically;
/// `active <-> disabled` only through an admin override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InviteCodeStatus {
    Active,
    Used,
    Expired,
    Disabled,
}

impl InviteCodeStatus {
    pub const ALL: [InviteCodeStatus; 4] = [
        InviteCodeStatus::Active,
        InviteCodeStatus::Used,
        InviteCodeStatus::Expired,
        InviteCodeStatus::Disabled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            InviteCodeStatus::Active => "active",
            InviteCodeStatus::Used => "used",
            InviteCodeStatus::Expired => "expired",
            InviteCodeStatus::Disabled => "disabled",
        }
    }
}

impl FromStr for InviteCodeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(InviteCodeStatus::Active),
            "used" => Ok(InviteCodeStatus::Used),
            "expired" => Ok(InviteCodeStatus::Expired),
            "disabled" => Ok(InviteCodeStatus::Disabled),
            _ => Err(format!("Unknown invite code status: {}", s)),
        }
    }
}

impl std::fmt::Display for InviteCodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn empty_metadata() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// An invite code gating access to the assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteCode {
    pub id: Uuid,
    pub code: String,
    #[serde(rename = "type")]
    pub code_type: InviteCodeType,
    pub max_uses: i32,
    pub used_count: i32,
    pub status: InviteCodeStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub created_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default = "empty_metadata")]
    pub metadata: serde_json::Value,
}

/// Outcome of checking an invite code against its status, expiry and ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    NotFound,
    Inactive,
    Expired,
    LimitReached,
}

impl Verdict {
    pub fn is_valid(self) -> bool {
        matches!(self, Verdict::Valid)
    }

    /// Human-readable reason for a rejection.
    pub fn reason(self) -> Option<&'static str> {
        match self {
            Verdict::Valid => None,
            Verdict::NotFound => Some("code does not exist"),
            Verdict::Inactive => Some("code inactive"),
            Verdict::Expired => Some("expired"),
            Verdict::LimitReached => Some("usage limit reached"),
        }
    }

    /// Status the stored record must be moved to, if the verdict implies one.
    pub fn status_correction(self) -> Option<InviteCodeStatus> {
        match self {
            Verdict::Expired => Some(InviteCodeStatus::Expired),
            Verdict::LimitReached => Some(InviteCodeStatus::Used),
            _ => None,
        }
    }

    /// Maps a stored reason string back to its verdict.
    pub fn from_reason(reason: Option<&str>) -> Self {
        match reason {
            None => Verdict::Valid,
            Some("code inactive") => Verdict::Inactive,
            Some("expired") => Verdict::Expired,
            Some("usage limit reached") => Verdict::LimitReached,
            Some(_) => Verdict::NotFound,
        }
    }
}

impl InviteCode {
    /// Builds a fresh `active` code from creation options.
    pub fn new(
        code: String,
        options: &GenerateOptions,
        created_by: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            code,
            code_type: options.code_type,
            max_uses: options.resolved_max_uses(),
            used_count: 0,
            status: InviteCodeStatus::Active,
            created_at: now,
            expires_at: options.expires_at,
            created_by: created_by.into(),
            note: options.note.clone().filter(|n| !n.is_empty()),
            metadata: options.metadata.clone().unwrap_or_else(empty_metadata),
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.max_uses == UNLIMITED_USES
    }

    /// True when a capped code has no uses left.
    pub fn is_exhausted(&self) -> bool {
        !self.is_unlimited() && self.used_count >= self.max_uses
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at < now).unwrap_or(false)
    }

    /// Classifies the code without touching storage.
    ///
    /// Checks run in order: status, expiry, usage ceiling. A code already
    /// marked `expired` keeps reporting `Expired`, so repeated validation
    /// gives the same answer.
    pub fn classify(&self, now: DateTime<Utc>) -> Verdict {
        if self.status == InviteCodeStatus::Expired {
            Verdict::Expired
        } else if self.status != InviteCodeStatus::Active {
            Verdict::Inactive
        } else if self.is_expired_at(now) {
            Verdict::Expired
        } else if self.is_exhausted() {
            Verdict::LimitReached
        } else {
            Verdict::Valid
        }
    }

    /// Records one consumption.
    ///
    /// Returns false and leaves the record untouched if the code is not
    /// currently consumable. Moves a capped code to `used` on its last use.
    pub fn record_use(&mut self, now: DateTime<Utc>) -> bool {
        if !self.classify(now).is_valid() {
            return false;
        }
        self.used_count += 1;
        if self.is_exhausted() {
            self.status = InviteCodeStatus::Used;
        }
        true
    }
}

/// Client details captured when a code is consumed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

/// One successful consumption of an invite code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteCodeUsage {
    pub id: Uuid,
    pub code_id: Uuid,
    pub code: String,
    pub used_at: DateTime<Utc>,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

impl InviteCodeUsage {
    pub fn new(
        invite: &InviteCode,
        session_id: impl Into<String>,
        client: &ClientInfo,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            code_id: invite.id,
            code: invite.code.clone(),
            used_at: now,
            session_id: session_id.into(),
            user_agent: client.user_agent.clone(),
            ip_address: client.ip_address.clone(),
        }
    }
}

/// Result of validating an invite code.
///
/// A rejected code is a normal value, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteCodeValidation {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<InviteCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl InviteCodeValidation {
    pub fn from_verdict(verdict: Verdict, code: Option<InviteCode>) -> Self {
        Self {
            valid: verdict.is_valid(),
            code,
            reason: verdict.reason().map(str::to_string),
        }
    }

    pub fn not_found() -> Self {
        Self::from_verdict(Verdict::NotFound, None)
    }

    pub fn verdict(&self) -> Verdict {
        if self.valid {
            Verdict::Valid
        } else {
            Verdict::from_reason(self.reason.as_deref())
        }
    }
}

/// Aggregate counters for the admin dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteCodeStats {
    pub total_codes: i64,
    pub active_codes: i64,
    pub used_codes: i64,
    pub expired_codes: i64,
    pub disabled_codes: i64,
    pub total_usages: i64,
    pub recent_usages: Vec<InviteCodeUsage>,
}

impl InviteCodeStats {
    /// Builds stats from a full snapshot of codes and usages.
    pub fn from_snapshot(codes: &[InviteCode], usages: &[InviteCodeUsage]) -> Self {
        let count = |status: InviteCodeStatus| {
            codes.iter().filter(|c| c.status == status).count() as i64
        };

        let mut recent: Vec<InviteCodeUsage> = usages.to_vec();
        recent.sort_by(|a, b| b.used_at.cmp(&a.used_at));
        recent.truncate(RECENT_USAGE_LIMIT);

        Self {
            total_codes: codes.len() as i64,
            active_codes: count(InviteCodeStatus::Active),
            used_codes: count(InviteCodeStatus::Used),
            expired_codes: count(InviteCodeStatus::Expired),
            disabled_codes: count(InviteCodeStatus::Disabled),
            total_usages: usages.len() as i64,
            recent_usages: recent,
        }
    }
}

/// Options for creating invite codes.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateOptions {
    #[serde(rename = "type")]
    pub code_type: InviteCodeType,

    /// Explicit ceiling. Zero counts as "not given".
    #[validate(range(min = 0, max = 1000000, message = "maxUses must be between 0 and 1000000"))]
    pub max_uses: Option<i32>,

    pub expires_at: Option<DateTime<Utc>>,

    #[validate(length(max = 500, message = "note must be at most 500 characters"))]
    pub note: Option<String>,

    #[validate(length(max = 16, message = "prefix must be at most 16 characters"))]
    pub prefix: Option<String>,

    /// Body length, excluding the prefix (default: 12).
    #[validate(range(min = 1, max = 64, message = "length must be between 1 and 64"))]
    pub length: Option<usize>,

    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl GenerateOptions {
    pub fn of_type(code_type: InviteCodeType) -> Self {
        Self {
            code_type,
            max_uses: None,
            expires_at: None,
            note: None,
            prefix: None,
            length: None,
            metadata: None,
        }
    }

    /// Ceiling the new code will carry; `unlimited` always yields -1.
    pub fn resolved_max_uses(&self) -> i32 {
        match (self.code_type, self.max_uses) {
            (InviteCodeType::Unlimited, _) => UNLIMITED_USES,
            (_, Some(n)) if n > 0 => n,
            (code_type, _) => code_type.default_max_uses(),
        }
    }

    pub fn resolved_length(&self) -> usize {
        self.length.unwrap_or(DEFAULT_CODE_LENGTH)
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref().filter(|p| !p.is_empty())
    }
}
