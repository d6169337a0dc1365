//! Credential issuance for download access.
//!
//! The buyer gets a short human-enterable password; the ledger stores only
//! its Argon2id hash. There is no rotation and no recovery flow - losing the
//! email means losing access.

use argon2::password_hash::{rand_core::OsRng as HashOsRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use rand::rngs::OsRng;
use rand::Rng;

use crate::error::{AppError, Result};

/// Unambiguous character set: no 0/O, 1/l/I/i or o to avoid transcription
/// errors when the buyer types the password from their email.
const PASSWORD_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZabcdefghjkmnpqrstuvwxyz23456789";

/// 12 chars from a 54-symbol alphabet is ~69 bits of entropy.
const PASSWORD_LEN: usize = 12;

/// Generate a fresh download password from OS entropy.
pub fn generate_password() -> String {
    let mut rng = OsRng;
    (0..PASSWORD_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..PASSWORD_ALPHABET.len());
            PASSWORD_ALPHABET[idx] as char
        })
        .collect()
}

/// Hash a password for storage with Argon2id and a random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut HashOsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a presented password against a stored hash.
///
/// `Ok(false)` is a mismatch; `Err` means the stored hash itself is
/// unparseable. The library's verify is constant-time over the digest.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| AppError::Internal(format!("Corrupt credential hash: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
