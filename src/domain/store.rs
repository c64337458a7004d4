//! Transaction boundary over the credential and role stores

use async_trait::async_trait;

use crate::domain::{CredentialStore, DomainResult, RoleStore};

/// A unit of work. Reads see the transaction's own writes; nothing is
/// visible to other readers until `commit` succeeds.
///
/// Dropping a transaction without committing discards its writes.
#[async_trait]
pub trait IdentityTransaction: CredentialStore + RoleStore {
    async fn commit(self: Box<Self>) -> DomainResult<()>;
    async fn rollback(self: Box<Self>) -> DomainResult<()>;
}

/// Store with autocommit reads/writes plus explicit transactions.
#[async_trait]
pub trait IdentityStore: CredentialStore + RoleStore {
    async fn begin(&self) -> DomainResult<Box<dyn IdentityTransaction>>;
}
