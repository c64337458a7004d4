use async_trait::async_trait;

use super::User;
use crate::domain::DomainResult;

/// Persistence port for user records.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn exists_by_username(&self, username: &str) -> DomainResult<bool>;

    async fn find_by_username(&self, username: &str) -> DomainResult<Option<User>>;

    /// Insert or update the whole record, role assignment included.
    ///
    /// Fails with `AlreadyExists` when another record holds the username.
    async fn save(&self, user: &User) -> DomainResult<()>;

    /// Assigned role names in assignment order. Empty for unknown users.
    async fn find_role_names_by_username(&self, username: &str) -> DomainResult<Vec<String>>;
}
