//! Password hashing with Argon2id and a random per-password salt.

use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::rngs::OsRng;
use secrecy::{ExposeSecret, SecretString};

#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("failed to hash password: {0}")]
    Hash(argon2::password_hash::Error),
    #[error("hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Hash `password` into a PHC string (`$argon2id$...`).
///
/// # Errors
/// Returns an error if Argon2 rejects the input or parameters.
pub fn hash_password(password: &SecretString) -> Result<String, HashError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.expose_secret().as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(HashError::Hash)
}

/// Same as [`hash_password`] but off the async executor; Argon2 is CPU bound.
///
/// # Errors
/// Returns an error if hashing fails or the blocking task panics.
pub async fn hash_password_blocking(password: SecretString) -> Result<String, HashError> {
    tokio::task::spawn_blocking(move || hash_password(&password)).await?
}

/// Check `password` against a stored PHC string. Malformed hashes never verify.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}
