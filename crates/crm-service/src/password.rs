//! Password hashing with Argon2.
//!
//! Hashing is CPU-bound, so the async helpers run it on the blocking pool.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::error::ApiError;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Password hashing errors.
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Hashing failed or a stored hash could not be parsed.
    #[error("hash error: {0}")]
    Hash(String),
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Hash a password into a PHC string.
///
/// # Errors
///
/// Returns `PasswordError::Hash` if Argon2 fails.
pub fn hash(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Check a password against a stored PHC string.
///
/// A stored value that is not a valid hash never verifies.
#[must_use]
pub fn verify(password: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        tracing::warn!("stored password hash is not a valid PHC string");
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Reject passwords shorter than [`MIN_PASSWORD_LEN`].
///
/// # Errors
///
/// Returns a 400 `validation_error`.
pub fn check_strength(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// [`hash`] on the blocking pool.
///
/// # Errors
///
/// Returns `ApiError::Internal` if hashing fails or the task panics.
pub async fn hash_async(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || hash(&password))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)
}

/// [`verify`] on the blocking pool.
///
/// # Errors
///
/// Returns `ApiError::Internal` if the task panics.
pub async fn verify_async(password: String, stored: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || verify(&password, &stored))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))
}
