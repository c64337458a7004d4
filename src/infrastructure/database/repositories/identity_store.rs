//! SeaORM-backed identity store
//!
//! `SeaOrmIdentityStore` runs each call in autocommit mode against the pool;
//! `begin` hands out a `SeaOrmIdentityTransaction` wrapping a
//! `DatabaseTransaction` that is rolled back on drop unless committed.
//!
//! Write transactions are serialized through a store-wide gate. SQLite opens
//! transactions deferred, and two of them that both read before writing
//! cannot upgrade to the write lock at the same time; one gets `SQLITE_BUSY`
//! straight away instead of waiting.

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::role_repository;
use super::user_repository::{self, db_err};
use crate::domain::{
    CredentialStore, DomainResult, IdentityStore, IdentityTransaction, Role, RoleStore, User,
};

pub struct SeaOrmIdentityStore {
    db: DatabaseConnection,
    write_gate: Arc<Mutex<()>>,
}

impl SeaOrmIdentityStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            write_gate: Arc::new(Mutex::new(())),
        }
    }
}

#[async_trait]
impl CredentialStore for SeaOrmIdentityStore {
    async fn exists_by_username(&self, username: &str) -> DomainResult<bool> {
        user_repository::exists_by_username(&self.db, username).await
    }

    async fn find_by_username(&self, username: &str) -> DomainResult<Option<User>> {
        user_repository::find_by_username(&self.db, username).await
    }

    async fn save(&self, user: &User) -> DomainResult<()> {
        // Row + role assignments must land together even outside a unit of work
        let _gate = self.write_gate.lock().await;
        let txn = self.db.begin().await.map_err(db_err)?;
        user_repository::save_user(&txn, user).await?;
        txn.commit().await.map_err(db_err)
    }

    async fn find_role_names_by_username(&self, username: &str) -> DomainResult<Vec<String>> {
        user_repository::find_role_names_by_username(&self.db, username).await
    }
}

#[async_trait]
impl RoleStore for SeaOrmIdentityStore {
    async fn find_by_name(&self, name: &str) -> DomainResult<Option<Role>> {
        role_repository::find_role_by_name(&self.db, name).await
    }

    async fn create_role(&self, name: &str) -> DomainResult<Role> {
        role_repository::create_role(&self.db, name).await
    }
}

#[async_trait]
impl IdentityStore for SeaOrmIdentityStore {
    async fn begin(&self) -> DomainResult<Box<dyn IdentityTransaction>> {
        let gate = self.write_gate.clone().lock_owned().await;
        let txn = self.db.begin().await.map_err(db_err)?;
        Ok(Box::new(SeaOrmIdentityTransaction { txn, _gate: gate }))
    }
}

/// Holds the store's write gate until committed, rolled back or dropped.
pub struct SeaOrmIdentityTransaction {
    // declared first so the transaction ends before the gate opens
    txn: DatabaseTransaction,
    _gate: OwnedMutexGuard<()>,
}

#[async_trait]
impl CredentialStore for SeaOrmIdentityTransaction {
    async fn exists_by_username(&self, username: &str) -> DomainResult<bool> {
        user_repository::exists_by_username(&self.txn, username).await
    }

    async fn find_by_username(&self, username: &str) -> DomainResult<Option<User>> {
        user_repository::find_by_username(&self.txn, username).await
    }

    async fn save(&self, user: &User) -> DomainResult<()> {
        user_repository::save_user(&self.txn, user).await
    }

    async fn find_role_names_by_username(&self, username: &str) -> DomainResult<Vec<String>> {
        user_repository::find_role_names_by_username(&self.txn, username).await
    }
}

#[async_trait]
impl RoleStore for SeaOrmIdentityTransaction {
    async fn find_by_name(&self, name: &str) -> DomainResult<Option<Role>> {
        role_repository::find_role_by_name(&self.txn, name).await
    }

    async fn create_role(&self, name: &str) -> DomainResult<Role> {
        role_repository::create_role(&self.txn, name).await
    }
}

#[async_trait]
impl IdentityTransaction for SeaOrmIdentityTransaction {
    async fn commit(self: Box<Self>) -> DomainResult<()> {
        let Self { txn, _gate } = *self;
        txn.commit().await.map_err(db_err)
    }

    async fn rollback(self: Box<Self>) -> DomainResult<()> {
        let Self { txn, _gate } = *self;
        txn.rollback().await.map_err(db_err)
    }
}
