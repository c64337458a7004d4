use async_trait::async_trait;

use crate::domain::{DomainResult, VerifiedIdentity};

/// One-way password digest.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> DomainResult<String>;

    /// `false` on mismatch and on a digest the hasher cannot parse
    fn matches(&self, plaintext: &str, digest: &str) -> bool;
}

/// Verifies a username/password pair against stored records.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Fails with `BadCredentials` for an unknown username or a wrong
    /// password; the two cases are indistinguishable to the caller.
    async fn authenticate(&self, username: &str, password: &str) -> DomainResult<VerifiedIdentity>;
}

/// Signs a token for a verified identity.
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, identity: &VerifiedIdentity) -> DomainResult<String>;
}
