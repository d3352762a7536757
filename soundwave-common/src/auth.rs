//! Password hashing and access token helpers
//!
//! Passwords are stored as salted SHA-256 digests, with the hash and salt
//! in separate columns of the users table. Access tokens are opaque random
//! strings persisted in the auth_tokens table together with an expiry; a
//! token authenticates a request only while its row exists and has not
//! expired.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Minimum accepted password length
pub const MIN_PASSWORD_LENGTH: usize = 8;

fn random_hex(num_bytes: usize) -> String {
    let mut bytes = vec![0u8; num_bytes];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Generate a random password salt (32 hex characters)
pub fn generate_salt() -> String {
    random_hex(16)
}

/// Hash a password with the given salt
///
/// The digest is SHA-256 over salt bytes followed by password bytes,
/// rendered as 64 hex characters.
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Verify a password against a stored hash and salt
pub fn verify_password(password: &str, salt: &str, stored_hash: &str) -> bool {
    hash_password(password, salt) == stored_hash
}

/// Generate an opaque access token (64 hex characters)
pub fn generate_token() -> String {
    random_hex(32)
}

/// Expiry instant for a token minted at `now`
pub fn token_expiry(now: DateTime<Utc>, expire_minutes: i64) -> DateTime<Utc> {
    now + Duration::minutes(expire_minutes)
}

/// Whether a token with the given expiry is still valid at `now`
pub fn token_is_valid(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now < expires_at
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic_per_salt() {
        let salt = "00112233445566778899aabbccddeeff";
        let first = hash_password("hunter22", salt);
        let second = hash_password("hunter22", salt);

        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_different_salts_produce_different_hashes() {
        let first = hash_password("hunter22", &generate_salt());
        let second = hash_password("hunter22", &generate_salt());

        assert_ne!(first, second);
    }

    #[test]
    fn test_verify_accepts_correct_password() {
        let salt = generate_salt();
        let stored = hash_password("correct horse", &salt);

        assert!(verify_password("correct horse", &salt, &stored));
    }

    #[test]
    fn test_verify_rejects_wrong_password() {
        let salt = generate_salt();
        let stored = hash_password("correct horse", &salt);

        assert!(!verify_password("battery staple", &salt, &stored));
    }

    #[test]
    fn test_generated_tokens_are_unique() {
        let first = generate_token();
        let second = generate_token();

        assert_eq!(first.len(), 64);
        assert_ne!(first, second);
    }

    #[test]
    fn test_token_expiry_window() {
        let now = Utc::now();
        let expires_at = token_expiry(now, 30);

        assert!(token_is_valid(expires_at, now));
        assert!(token_is_valid(expires_at, now + Duration::minutes(29)));
        assert!(!token_is_valid(expires_at, now + Duration::minutes(30)));
        assert!(!token_is_valid(expires_at, now + Duration::minutes(31)));
    }
}
