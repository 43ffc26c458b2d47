//! Password hashing for account credentials.
//!
//! Argon2id is CPU-bound, so both hashing and verification run on the blocking
//! pool instead of inside the account actor or an async handler.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand_core::OsRng;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CredentialError {
    #[error("password hashing failed")]
    Hash,
    #[error("stored password hash is malformed")]
    MalformedHash,
    #[error("hashing task failed: {0}")]
    Task(String),
}

#[derive(Debug, Clone, Default)]
pub struct CredentialHasher {
    params: Params,
}

impl CredentialHasher {
    pub fn with_params(params: Params) -> Self {
        Self { params }
    }

    /// Hashes `password` into a PHC string with a fresh salt.
    pub async fn hash(&self, password: String) -> Result<String, CredentialError> {
        let params = self.params.clone();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|_| CredentialError::Hash)
        })
        .await
        .map_err(|e| CredentialError::Task(e.to_string()))?
    }

    /// Checks `password` against a stored PHC string. The cost parameters
    /// come from the hash itself, not from this hasher.
    pub async fn verify(&self, password: String, hash: String) -> Result<bool, CredentialError> {
        tokio::task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&hash).map_err(|_| CredentialError::MalformedHash)?;
            Ok(Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok())
        })
        .await
        .map_err(|e| CredentialError::Task(e.to_string()))?
    }
}

/// Minimum-cost parameters so tests do not spend seconds per hash.
#[cfg(test)]
pub(crate) fn test_hasher() -> CredentialHasher {
    CredentialHasher::with_params(Params::new(8, 1, 1, None).expect("valid argon2 params"))
}
