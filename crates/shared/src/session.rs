//! Admin session tokens.
//!
//! A session is a small record (admin id, username, role, expiry) that the
//! caller keeps after a successful login. It can be persisted as-is in the
//! client-local store, or signed into an HS256 JWT for bearer authentication.
//! Expiry is checked on every read in both forms.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Default session lifetime.
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

/// Error type for session token operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to encode session token: {0}")]
    EncodingError(String),

    #[error("Session has expired")]
    Expired,

    #[error("Invalid session token")]
    InvalidToken,

    #[error("Invalid session secret: {0}")]
    InvalidSecret(String),
}

/// An authenticated admin session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSession {
    pub admin_id: Uuid,
    pub username: String,
    pub role: String,
    pub expires_at: DateTime<Utc>,
}

impl AdminSession {
    /// Issues a session valid for `ttl` starting now.
    pub fn issue(
        admin_id: Uuid,
        username: impl Into<String>,
        role: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            admin_id,
            username: username.into(),
            role: role.into(),
            expires_at: Utc::now() + ttl,
        }
    }

    /// Returns true once `now` has reached the expiry instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sub: String,
    username: String,
    role: String,
    exp: i64,
    iat: i64,
    jti: String,
}

/// Signs and verifies session tokens with a shared secret.
#[derive(Clone)]
pub struct SessionSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for SessionSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSigner")
            .field("ttl_secs", &self.ttl.num_seconds())
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl SessionSigner {
    /// Creates a signer from an HMAC secret and session lifetime in hours.
    pub fn new(secret: &str, ttl_hours: i64) -> Result<Self, SessionError> {
        if secret.len() < 16 {
            return Err(SessionError::InvalidSecret(
                "secret must be at least 16 bytes".to_string(),
            ));
        }
        if ttl_hours <= 0 {
            return Err(SessionError::InvalidSecret(
                "session ttl must be positive".to_string(),
            ));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
        })
    }

    /// Issues a fresh session and returns it with its signed token.
    pub fn issue(
        &self,
        admin_id: Uuid,
        username: &str,
        role: &str,
    ) -> Result<(AdminSession, String), SessionError> {
        let session = AdminSession::issue(admin_id, username, role, self.ttl);
        let token = self.sign(&session)?;
        Ok((session, token))
    }

    /// Signs an existing session record.
    pub fn sign(&self, session: &AdminSession) -> Result<String, SessionError> {
        let claims = SessionClaims {
            sub: session.admin_id.to_string(),
            username: session.username.clone(),
            role: session.role.clone(),
            exp: session.expires_at.timestamp(),
            iat: Utc::now().timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| SessionError::EncodingError(e.to_string()))
    }

    /// Verifies a token and returns the session it carries.
    pub fn verify(&self, token: &str) -> Result<AdminSession, SessionError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        let data = decode::<SessionClaims>(token, &self.decoding_key, &validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => SessionError::Expired,
                _ => SessionError::InvalidToken,
            },
        )?;

        let claims = data.claims;
        let admin_id = Uuid::parse_str(&claims.sub).map_err(|_| SessionError::InvalidToken)?;
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or(SessionError::InvalidToken)?;

        let session = AdminSession {
            admin_id,
            username: claims.username,
            role: claims.role,
            expires_at,
        };
        if session.is_expired() {
            return Err(SessionError::Expired);
        }
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_session_secret_0123456789";

    #[test]
    fn test_issue_sets_24h_expiry() {
        let session = AdminSession::issue(
            Uuid::new_v4(),
            "alice",
            "super-admin",
            Duration::hours(DEFAULT_SESSION_TTL_HOURS),
        );
        let remaining = session.expires_at - Utc::now();
        assert!(remaining > Duration::hours(23));
        assert!(remaining <= Duration::hours(24));
        assert!(!session.is_expired());
    }

    #[test]
    fn test_is_expired_at_boundary() {
        let session = AdminSession::issue(Uuid::new_v4(), "a", "admin", Duration::hours(1));
        assert!(session.is_expired_at(session.expires_at));
        assert!(!session.is_expired_at(session.expires_at - Duration::seconds(1)));
    }

    #[test]
    fn test_sign_and_verify() {
        let signer = SessionSigner::new(SECRET, 24).unwrap();
        let admin_id = Uuid::new_v4();
        let (session, token) = signer.issue(admin_id, "alice", "super-admin").unwrap();

        let verified = signer.verify(&token).unwrap();
        assert_eq!(verified.admin_id, admin_id);
        assert_eq!(verified.username, "alice");
        assert_eq!(verified.role, "super-admin");
        assert_eq!(verified.expires_at.timestamp(), session.expires_at.timestamp());
    }

    #[test]
    fn test_verify_rejects_expired_session() {
        let signer = SessionSigner::new(SECRET, 24).unwrap();
        let expired = AdminSession {
            admin_id: Uuid::new_v4(),
            username: "bob".to_string(),
            role: "admin".to_string(),
            expires_at: Utc::now() - Duration::minutes(5),
        };
        let token = signer.sign(&expired).unwrap();
        assert!(matches!(signer.verify(&token), Err(SessionError::Expired)));
    }

    #[test]
    fn test_verify_rejects_foreign_signature() {
        let signer = SessionSigner::new(SECRET, 24).unwrap();
        let other = SessionSigner::new("another_secret_abcdefghijk", 24).unwrap();
        let (_, token) = other.issue(Uuid::new_v4(), "eve", "admin").unwrap();
        assert!(matches!(signer.verify(&token), Err(SessionError::InvalidToken)));
        assert!(matches!(signer.verify("garbage"), Err(SessionError::InvalidToken)));
    }

    #[test]
    fn test_signer_rejects_weak_config() {
        assert!(SessionSigner::new("short", 24).is_err());
        assert!(SessionSigner::new(SECRET, 0).is_err());
    }

    #[test]
    fn test_session_serializes_camel_case() {
        let session = AdminSession::issue(Uuid::new_v4(), "alice", "admin", Duration::hours(1));
        let json = serde_json::to_value(&session).unwrap();
        assert!(json.get("adminId").is_some());
        assert!(json.get("expiresAt").is_some());
    }

    #[test]
    fn test_signer_debug_redacts_secret() {
        let signer = SessionSigner::new(SECRET, 24).unwrap();
        let debug = format!("{:?}", signer);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains(SECRET));
    }
}
