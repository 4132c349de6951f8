//! Credential verification against stored hashes.
//!
//! Slow, salted one-way comparison behind a trait seam so the cost
//! profile is externally configurable. Plaintext secrets are never
//! logged and never stored.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params,
};
use rand::rngs::OsRng;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("hashing failed: {0}")]
    HashFailed(String),
}

/// Pluggable hasher for stored credentials.
pub trait CredentialHasher: Send + Sync {
    /// Hash a plaintext secret into a PHC-format string.
    fn hash(&self, secret: &str) -> Result<String, HashError>;

    /// Compare a plaintext secret against a stored hash. No side
    /// effects; any parse failure counts as a mismatch.
    fn verify(&self, secret: &str, stored_hash: &str) -> bool;
}

/// Argon2id hasher with configurable cost.
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    /// Default parameters, suitable for development and tests.
    #[must_use]
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }

    /// Production-grade cost: memory in KiB, iteration count, lanes.
    pub fn with_cost(memory_kib: u32, iterations: u32, lanes: u32) -> Result<Self, HashError> {
        let params = Params::new(memory_kib, iterations, lanes, None)
            .map_err(|err| HashError::HashFailed(err.to_string()))?;
        Ok(Self {
            argon2: Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params),
        })
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, secret: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(secret.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| HashError::HashFailed(err.to_string()))
    }

    fn verify(&self, secret: &str, stored_hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored_hash) else {
            return false;
        };
        self.argon2
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok()
    }
}
