//! Password hashing utilities

use bcrypt::{hash, verify};
use tracing::warn;

use crate::domain::{DomainError, DomainResult, PasswordHasher};

/// Lowest work factor bcrypt accepts
pub const MIN_COST: u32 = 4;
/// Highest work factor bcrypt accepts
pub const MAX_COST: u32 = 31;

/// bcrypt-backed [`PasswordHasher`]
#[derive(Debug, Clone)]
pub struct BcryptPasswordHasher {
    cost: u32,
}

impl BcryptPasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl PasswordHasher for BcryptPasswordHasher {
    fn hash(&self, plaintext: &str) -> DomainResult<String> {
        hash(plaintext, self.cost)
            .map_err(|e| DomainError::Crypto(format!("Failed to hash password: {}", e)))
    }

    fn matches(&self, plaintext: &str, digest: &str) -> bool {
        match verify(plaintext, digest) {
            Ok(valid) => valid,
            Err(e) => {
                warn!(error = %e, "Stored password digest could not be verified");
                false
            }
        }
    }
}
