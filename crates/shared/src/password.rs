//! Admin password hashing using Argon2id.
//!
//! Both storage backends store admin credentials as PHC strings produced
//! here. Hashes written by the old browser-only build (base64 of the
//! password plus a fixed suffix) are recognised so they can be rejected
//! and reported, never verified.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashError(String),

    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    #[error("Stored credential is not a PHC string")]
    InvalidHashFormat,

    #[error("Stored credential uses the retired obfuscation scheme")]
    LegacyObfuscation,
}

/// Argon2id cost: 19 MiB, two passes, one lane, 32-byte tag.
const ARGON2_PARAMS: (u32, u32, u32, usize) = (19 * 1024, 2, 1, 32);

/// Suffix the retired browser build appended before base64 encoding.
const LEGACY_SUFFIX: &str = "sri_salt_2024";

fn hasher() -> Result<Argon2<'static>, PasswordError> {
    let (m_cost, t_cost, p_cost, len) = ARGON2_PARAMS;
    Params::new(m_cost, t_cost, p_cost, Some(len))
        .map(|params| Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
        .map_err(|e| PasswordError::HashError(e.to_string()))
}

/// Hashes an admin password with a fresh random salt into a PHC string.
///
/// ```
/// let phc = shared::password::hash_password("secret1").unwrap();
/// assert!(phc.starts_with("$argon2id$"));
/// ```
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let phc = hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(e.to_string()))?;
    Ok(phc.to_string())
}

/// `Ok(false)` on a mismatch. Legacy obfuscated credentials are refused
/// with [`PasswordError::LegacyObfuscation`] before any comparison.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, PasswordError> {
    if is_legacy_obfuscation(stored) {
        return Err(PasswordError::LegacyObfuscation);
    }
    let phc = PasswordHash::new(stored).map_err(|_| PasswordError::InvalidHashFormat)?;

    // Cost parameters are read back from the PHC string.
    Argon2::default()
        .verify_password(password.as_bytes(), &phc)
        .map(|()| true)
        .or_else(|e| match e {
            argon2::password_hash::Error::Password => Ok(false),
            other => Err(PasswordError::VerifyError(other.to_string())),
        })
}

/// Detects credentials written by the retired browser-only build.
pub fn is_legacy_obfuscation(hash: &str) -> bool {
    if hash.starts_with('$') {
        return false;
    }
    STANDARD
        .decode(hash)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .map(|plain| plain.ends_with(LEGACY_SUFFIX))
        .unwrap_or(false)
}
