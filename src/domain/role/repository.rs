use async_trait::async_trait;

use super::Role;
use crate::domain::DomainResult;

#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Exact, case-sensitive lookup
    async fn find_by_name(&self, name: &str) -> DomainResult<Option<Role>>;

    /// Used by startup seeding only; the core never creates roles.
    async fn create_role(&self, name: &str) -> DomainResult<Role>;
}
