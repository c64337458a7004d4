//! Startup seeding of the role catalogue

use tracing::info;

use super::service::finish_transaction;
use crate::domain::{DomainResult, IdentityStore, IdentityTransaction};

/// Create every configured role that does not exist yet, in one transaction.
///
/// Idempotent; returns how many roles were created.
pub async fn seed_roles(store: &dyn IdentityStore, names: &[String]) -> DomainResult<usize> {
    let tx = store.begin().await?;
    let result = seed_in(tx.as_ref(), names).await;
    let created = finish_transaction(tx, result).await?;

    if created > 0 {
        info!(created, "Seeded roles");
    }
    Ok(created)
}

async fn seed_in(tx: &dyn IdentityTransaction, names: &[String]) -> DomainResult<usize> {
    let mut created = 0;
    for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
        if tx.find_by_name(name).await?.is_none() {
            tx.create_role(name).await?;
            created += 1;
        }
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RoleStore;
    use crate::infrastructure::InMemoryIdentityStore;

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let store = InMemoryIdentityStore::new();
        let names = vec!["USER".to_string(), "ADMIN".to_string(), "USER".to_string()];

        assert_eq!(seed_roles(&store, &names).await.unwrap(), 2);
        assert_eq!(seed_roles(&store, &names).await.unwrap(), 0);
        assert!(store.find_by_name("ADMIN").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn blank_names_are_skipped() {
        let store = InMemoryIdentityStore::new();
        let names = vec!["  ".to_string(), " EDITOR ".to_string()];

        assert_eq!(seed_roles(&store, &names).await.unwrap(), 1);
        assert!(store.find_by_name("EDITOR").await.unwrap().is_some());
    }
}
