//! Password hashing using argon2 or bcrypt
//!
//! New hashes use the configured algorithm. Verification picks the algorithm
//! from the stored hash, so bcrypt hashes written by earlier deployments keep
//! verifying after a switch to argon2.
//!
//! # Performance Considerations
//!
//! Both algorithms are intentionally CPU-intensive. Async callers should use
//! `hash_async` / `verify_async`, which run on the blocking thread pool.

use crate::config::{PasswordAlgorithm, PasswordConfig};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// Well-formed argon2id hash, default parameters, that no password verifies
/// against
const ARGON2_DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// Password hashing failures
#[derive(Error, Debug)]
pub enum PasswordError {
    /// The password does not match the hash
    #[error("Password mismatch")]
    Mismatch,

    /// The stored hash could not be parsed
    #[error("Malformed password hash: {0}")]
    MalformedHash(String),

    /// Hashing backend failure (salt generation, cost parameters, worker join)
    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

/// Input for the bcrypt dummy hash; never a stored credential
const DUMMY_PASSWORD: &str = "placer-dummy-password-never-issued";

/// Password hashing service
///
/// Argon2id is the default; bcrypt is available for compatibility with
/// hashes produced by the previous backend.
#[derive(Debug, Clone)]
pub struct PasswordService {
    algorithm: PasswordAlgorithm,
    bcrypt_cost: u32,
    /// Hash in the configured algorithm and cost, verified for unknown accounts
    dummy_hash: Arc<str>,
}

impl Default for PasswordService {
    fn default() -> Self {
        Self::from_config(&PasswordConfig::default())
    }
}

impl PasswordService {
    /// With bcrypt this runs one hash at the configured cost to build the
    /// dummy, so call it once at startup.
    pub fn new(algorithm: PasswordAlgorithm, bcrypt_cost: u32) -> Self {
        let dummy_hash: Arc<str> = match algorithm {
            PasswordAlgorithm::Argon2 => Arc::from(ARGON2_DUMMY_HASH),
            PasswordAlgorithm::Bcrypt => match bcrypt::hash(DUMMY_PASSWORD, bcrypt_cost) {
                Ok(hash) => Arc::from(hash),
                Err(e) => {
                    warn!(error = %e, cost = bcrypt_cost, "Falling back to argon2 dummy hash");
                    Arc::from(ARGON2_DUMMY_HASH)
                }
            },
        };

        Self {
            algorithm,
            bcrypt_cost,
            dummy_hash,
        }
    }

    pub fn from_config(config: &PasswordConfig) -> Self {
        Self::new(config.algorithm, config.bcrypt_cost)
    }

    /// Hash a password with a fresh random salt (blocking operation)
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        match self.algorithm {
            PasswordAlgorithm::Argon2 => {
                let salt = SaltString::generate(&mut OsRng);
                Argon2::default()
                    .hash_password(password.as_bytes(), &salt)
                    .map(|hash| hash.to_string())
                    .map_err(|e| PasswordError::Hashing(e.to_string()))
            }
            PasswordAlgorithm::Bcrypt => bcrypt::hash(password, self.bcrypt_cost)
                .map_err(|e| PasswordError::Hashing(e.to_string())),
        }
    }

    /// Verify a password against a stored hash (blocking operation)
    ///
    /// Comparison is constant-time in both backends.
    pub fn verify(&self, password: &str, hash: &str) -> Result<(), PasswordError> {
        if is_bcrypt_hash(hash) {
            return match bcrypt::verify(password, hash) {
                Ok(true) => Ok(()),
                Ok(false) => Err(PasswordError::Mismatch),
                Err(e) => Err(PasswordError::MalformedHash(e.to_string())),
            };
        }

        let parsed =
            PasswordHash::new(hash).map_err(|e| PasswordError::MalformedHash(e.to_string()))?;
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(()),
            Err(argon2::password_hash::Error::Password) => Err(PasswordError::Mismatch),
            Err(e) => Err(PasswordError::Hashing(e.to_string())),
        }
    }

    /// Run a verification whose result is discarded
    ///
    /// Keeps the unknown-account path as slow as a real mismatch under the
    /// configured algorithm.
    pub fn verify_dummy(&self, password: &str) {
        let _ = self.verify(password, &self.dummy_hash);
    }

    /// Hash a password on the blocking thread pool
    pub async fn hash_async(&self, password: String) -> Result<String, PasswordError> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.hash(&password))
            .await
            .map_err(|e| PasswordError::Hashing(format!("Task join error: {}", e)))?
    }

    /// Verify a password on the blocking thread pool
    pub async fn verify_async(&self, password: String, hash: String) -> Result<(), PasswordError> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.verify(&password, &hash))
            .await
            .map_err(|e| PasswordError::Hashing(format!("Task join error: {}", e)))?
    }

    /// Dummy verification on the blocking thread pool
    pub async fn verify_dummy_async(&self, password: String) {
        let service = self.clone();
        let _ = tokio::task::spawn_blocking(move || service.verify_dummy(&password)).await;
    }
}

fn is_bcrypt_hash(hash: &str) -> bool {
    ["$2a$", "$2b$", "$2x$", "$2y$"]
        .iter()
        .any(|prefix| hash.starts_with(prefix))
}
