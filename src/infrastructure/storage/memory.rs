//! In-memory identity store for development and testing
//!
//! Transactions buffer their writes and apply them on commit under a single
//! lock, re-checking username and role-name uniqueness the way a unique
//! index would.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::{
    CredentialStore, DomainError, DomainResult, IdentityStore, IdentityTransaction, Role,
    RoleStore, User,
};

#[derive(Default)]
struct Tables {
    /// keyed by username
    users: DashMap<String, User>,
    /// keyed by role name
    roles: DashMap<String, Role>,
    role_seq: AtomicI32,
    write_lock: Mutex<()>,
}

impl Tables {
    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn next_role_id(&self) -> i32 {
        self.role_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn check_user(&self, user: &User) -> DomainResult<()> {
        match self.users.get(&user.username) {
            Some(existing) if existing.id != user.id => {
                Err(DomainError::username_taken(&user.username))
            }
            _ => Ok(()),
        }
    }

    fn check_role(&self, name: &str) -> DomainResult<()> {
        if self.roles.contains_key(name) {
            return Err(DomainError::AlreadyExists {
                entity: "Role",
                field: "name",
                value: name.to_string(),
            });
        }
        Ok(())
    }

    /// Caller holds the write lock and has run `check_user`
    fn put_user(&self, user: User) {
        let stale_key = self
            .users
            .iter()
            .find(|e| e.id == user.id && e.key() != &user.username)
            .map(|e| e.key().clone());
        if let Some(key) = stale_key {
            self.users.remove(&key);
        }
        self.users.insert(user.username.clone(), user);
    }
}

/// In-memory [`IdentityStore`] backed by `DashMap`
#[derive(Clone, Default)]
pub struct InMemoryIdentityStore {
    tables: Arc<Tables>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn user_count(&self) -> usize {
        self.tables.users.len()
    }
}

#[async_trait]
impl CredentialStore for InMemoryIdentityStore {
    async fn exists_by_username(&self, username: &str) -> DomainResult<bool> {
        Ok(self.tables.users.contains_key(username))
    }

    async fn find_by_username(&self, username: &str) -> DomainResult<Option<User>> {
        Ok(self.tables.users.get(username).map(|u| u.clone()))
    }

    async fn save(&self, user: &User) -> DomainResult<()> {
        let _guard = self.tables.lock_writes();
        self.tables.check_user(user)?;
        self.tables.put_user(user.clone());
        Ok(())
    }

    async fn find_role_names_by_username(&self, username: &str) -> DomainResult<Vec<String>> {
        Ok(self
            .tables
            .users
            .get(username)
            .map(|u| u.role_names())
            .unwrap_or_default())
    }
}

#[async_trait]
impl RoleStore for InMemoryIdentityStore {
    async fn find_by_name(&self, name: &str) -> DomainResult<Option<Role>> {
        Ok(self.tables.roles.get(name).map(|r| r.clone()))
    }

    async fn create_role(&self, name: &str) -> DomainResult<Role> {
        let _guard = self.tables.lock_writes();
        self.tables.check_role(name)?;
        let role = Role {
            id: self.tables.next_role_id(),
            name: name.to_string(),
        };
        self.tables.roles.insert(role.name.clone(), role.clone());
        Ok(role)
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn begin(&self) -> DomainResult<Box<dyn IdentityTransaction>> {
        Ok(Box::new(InMemoryIdentityTransaction {
            tables: Arc::clone(&self.tables),
            users: DashMap::new(),
            roles: DashMap::new(),
        }))
    }
}

/// Write buffer over the shared tables
pub struct InMemoryIdentityTransaction {
    tables: Arc<Tables>,
    users: DashMap<String, User>,
    roles: DashMap<String, Role>,
}

impl InMemoryIdentityTransaction {
    fn lookup_user(&self, username: &str) -> Option<User> {
        if let Some(pending) = self.users.get(username) {
            return Some(pending.clone());
        }
        self.tables.users.get(username).map(|u| u.clone())
    }
}

#[async_trait]
impl CredentialStore for InMemoryIdentityTransaction {
    async fn exists_by_username(&self, username: &str) -> DomainResult<bool> {
        Ok(self.lookup_user(username).is_some())
    }

    async fn find_by_username(&self, username: &str) -> DomainResult<Option<User>> {
        Ok(self.lookup_user(username))
    }

    async fn save(&self, user: &User) -> DomainResult<()> {
        if let Some(pending) = self.users.get(&user.username) {
            if pending.id != user.id {
                return Err(DomainError::username_taken(&user.username));
            }
        }
        self.tables.check_user(user)?;
        self.users.insert(user.username.clone(), user.clone());
        Ok(())
    }

    async fn find_role_names_by_username(&self, username: &str) -> DomainResult<Vec<String>> {
        Ok(self
            .lookup_user(username)
            .map(|u| u.role_names())
            .unwrap_or_default())
    }
}

#[async_trait]
impl RoleStore for InMemoryIdentityTransaction {
    async fn find_by_name(&self, name: &str) -> DomainResult<Option<Role>> {
        if let Some(pending) = self.roles.get(name) {
            return Ok(Some(pending.clone()));
        }
        Ok(self.tables.roles.get(name).map(|r| r.clone()))
    }

    async fn create_role(&self, name: &str) -> DomainResult<Role> {
        if self.roles.contains_key(name) {
            return Err(DomainError::AlreadyExists {
                entity: "Role",
                field: "name",
                value: name.to_string(),
            });
        }
        self.tables.check_role(name)?;
        let role = Role {
            id: self.tables.next_role_id(),
            name: name.to_string(),
        };
        self.roles.insert(role.name.clone(), role.clone());
        Ok(role)
    }
}

#[async_trait]
impl IdentityTransaction for InMemoryIdentityTransaction {
    async fn commit(self: Box<Self>) -> DomainResult<()> {
        let Self {
            tables,
            users,
            roles,
        } = *self;

        let _guard = tables.lock_writes();

        // Validate everything before applying anything
        for role in roles.iter() {
            tables.check_role(role.key())?;
        }
        for user in users.iter() {
            tables.check_user(user.value())?;
        }

        for (name, role) in roles {
            tables.roles.insert(name, role);
        }
        for (_, user) in users {
            tables.put_user(user);
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> DomainResult<()> {
        Ok(())
    }
}
