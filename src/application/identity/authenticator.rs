//! Store-backed credential verification

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::{
    Authenticator, CredentialStore, DomainError, DomainResult, PasswordHasher, VerifiedIdentity,
};

/// Looks the user up in the credential store and checks the password digest.
///
/// Generic over the store so it can sit on `dyn IdentityStore` as well as
/// on a concrete repository.
pub struct StoreAuthenticator<S: CredentialStore + ?Sized> {
    users: Arc<S>,
    hasher: Arc<dyn PasswordHasher>,
}

impl<S: CredentialStore + ?Sized> StoreAuthenticator<S> {
    pub fn new(users: Arc<S>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { users, hasher }
    }
}

#[async_trait]
impl<S: CredentialStore + ?Sized + 'static> Authenticator for StoreAuthenticator<S> {
    async fn authenticate(&self, username: &str, password: &str) -> DomainResult<VerifiedIdentity> {
        let Some(user) = self.users.find_by_username(username).await? else {
            debug!(username, "Authentication failed: unknown user");
            return Err(DomainError::BadCredentials);
        };

        if !self.hasher.matches(password, &user.password_hash) {
            debug!(username, "Authentication failed: password mismatch");
            return Err(DomainError::BadCredentials);
        }

        Ok(VerifiedIdentity::new(user.username.clone(), user.role_names()))
    }
}
