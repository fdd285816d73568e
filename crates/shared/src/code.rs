//! Invite code generation.

use rand::Rng;

/// Characters an invite code body is drawn from.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Body length used when the caller does not ask for one.
pub const DEFAULT_CODE_LENGTH: usize = 12;

/// Generates a random invite code of `length` characters, optionally prefixed.
///
/// Each body character is drawn independently and uniformly from
/// [`CODE_ALPHABET`]. This is not a cryptographic token: callers that need
/// uniqueness must check the store and retry.
///
/// # Example
/// ```
/// use shared::code::generate_random_code;
///
/// let code = generate_random_code(8, Some("VIP"));
/// assert_eq!(code.len(), 11);
/// assert!(code.starts_with("VIP"));
/// ```
pub fn generate_random_code(length: usize, prefix: Option<&str>) -> String {
    let mut rng = rand::thread_rng();
    let prefix = prefix.unwrap_or_default();

    let mut code = String::with_capacity(prefix.len() + length);
    code.push_str(prefix);
    code.extend((0..length).map(|_| {
        let idx = rng.gen_range(0..CODE_ALPHABET.len());
        CODE_ALPHABET[idx] as char
    }));
    code
}

/// Returns true if every character of `body` belongs to [`CODE_ALPHABET`].
pub fn is_code_body(body: &str) -> bool {
    body.bytes().all(|b| CODE_ALPHABET.contains(&b))
}
