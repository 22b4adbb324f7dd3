use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;

use super::error::StoreError;

/// Hash a plaintext password. Every call draws a fresh random salt.
pub(super) fn hash_password(plain: &str) -> Result<String, StoreError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| StoreError::Hash {
            message: format!("failed to hash password: {e}"),
        })?;
    Ok(hash.to_string())
}

/// Check `plain` against a stored PHC string.
pub(super) fn verify_password(plain: &str, stored: &str) -> Result<bool, StoreError> {
    let parsed = PasswordHash::new(stored).map_err(|e| StoreError::Hash {
        message: format!("stored password hash is malformed: {e}"),
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}
