//! Access-control service: application-layer orchestration
//!
//! All user-related business logic lives here.
//! HTTP handlers should be thin wrappers that delegate to this service.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::domain::{
    AuthenticatedSession, Authenticator, CreateUserDto, DomainError, DomainResult, IdentityStore,
    IdentityTransaction, LoginCredentials, PasswordHasher, Role, SecurityContext, TokenIssuer,
    User, UserProfile,
};

/// Access-control service: orchestrates registration, login, role lookup
/// and password change over the injected ports.
pub struct AccessControlService {
    store: Arc<dyn IdentityStore>,
    hasher: Arc<dyn PasswordHasher>,
    authenticator: Arc<dyn Authenticator>,
    tokens: Arc<dyn TokenIssuer>,
}

impl AccessControlService {
    pub fn new(
        store: Arc<dyn IdentityStore>,
        hasher: Arc<dyn PasswordHasher>,
        authenticator: Arc<dyn Authenticator>,
        tokens: Arc<dyn TokenIssuer>,
    ) -> Self {
        Self {
            store,
            hasher,
            authenticator,
            tokens,
        }
    }

    // ── Registration ────────────────────────────────────────────

    /// Register a new user with the named roles.
    ///
    /// Uniqueness is checked before role resolution. The first unknown role
    /// name aborts with `NotFound`. Everything runs in one transaction.
    pub async fn register(
        &self,
        candidate: CreateUserDto,
        role_names: &[String],
    ) -> DomainResult<UserProfile> {
        validate_username(&candidate.username)?;

        let tx = self.store.begin().await?;
        let result = self.register_in(tx.as_ref(), candidate, role_names).await;
        let outcome = finish_transaction(tx, result).await;

        match &outcome {
            Ok(user) => {
                metrics::counter!("auth_registrations_total", "outcome" => "success").increment(1);
                info!(user_id = %user.id, username = %user.username, "New user registered");
            }
            Err(e) => {
                metrics::counter!("auth_registrations_total", "outcome" => "rejected").increment(1);
                warn!(error = %e, "Registration rejected");
            }
        }

        outcome.map(|user| user.profile())
    }

    async fn register_in(
        &self,
        tx: &dyn IdentityTransaction,
        candidate: CreateUserDto,
        role_names: &[String],
    ) -> DomainResult<User> {
        if tx.exists_by_username(&candidate.username).await? {
            return Err(DomainError::username_taken(&candidate.username));
        }

        let mut roles: Vec<Role> = Vec::with_capacity(role_names.len());
        for name in role_names {
            if roles.iter().any(|r| &r.name == name) {
                continue;
            }
            let role = tx
                .find_by_name(name)
                .await?
                .ok_or_else(|| DomainError::role_not_found(name))?;
            roles.push(role);
        }

        let now = Utc::now();
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            username: candidate.username,
            password_hash: self.hasher.hash(&candidate.password)?,
            roles,
            created_at: now,
            updated_at: now,
        };

        tx.save(&user).await?;
        Ok(user)
    }

    // ── Authentication ──────────────────────────────────────────

    /// Verify credentials, record the identity in `context`, and issue a token.
    ///
    /// The returned roles keep the order the authenticator reported.
    pub async fn login(
        &self,
        credentials: &LoginCredentials,
        context: &mut SecurityContext,
    ) -> DomainResult<AuthenticatedSession> {
        let identity = match self
            .authenticator
            .authenticate(&credentials.username, &credentials.password)
            .await
        {
            Ok(identity) => identity,
            Err(e) => {
                metrics::counter!("auth_logins_total", "outcome" => "rejected").increment(1);
                warn!(username = %credentials.username, error = %e, "Login rejected");
                return Err(e);
            }
        };

        context.set_authentication(identity.clone());
        let token = self.tokens.issue(&identity)?;

        metrics::counter!("auth_logins_total", "outcome" => "success").increment(1);
        info!(username = %identity.username, "User logged in");

        Ok(AuthenticatedSession {
            token,
            roles: identity.authorities,
        })
    }

    // ── Queries ─────────────────────────────────────────────────

    /// Role names assigned to `username`, in stored order.
    pub async fn get_role_names_by_username(&self, username: &str) -> DomainResult<Vec<String>> {
        if !self.store.exists_by_username(username).await? {
            return Err(DomainError::user_not_found(username));
        }
        self.store.find_role_names_by_username(username).await
    }

    // ── Commands (mutations) ────────────────────────────────────

    /// Change a user's password. Verifies the old password first.
    pub async fn change_password(
        &self,
        username: &str,
        old_password: &str,
        new_password: &str,
    ) -> DomainResult<()> {
        let tx = self.store.begin().await?;
        let result = self
            .change_password_in(tx.as_ref(), username, old_password, new_password)
            .await;
        finish_transaction(tx, result).await?;

        info!(username, "Password changed");
        Ok(())
    }

    async fn change_password_in(
        &self,
        tx: &dyn IdentityTransaction,
        username: &str,
        old_password: &str,
        new_password: &str,
    ) -> DomainResult<()> {
        let mut user = tx
            .find_by_username(username)
            .await?
            .ok_or_else(|| DomainError::user_not_found(username))?;

        if !self.hasher.matches(old_password, &user.password_hash) {
            return Err(DomainError::InvalidCredential(
                "Old password does not match".into(),
            ));
        }

        user.password_hash = self.hasher.hash(new_password)?;
        user.updated_at = Utc::now();
        tx.save(&user).await
    }
}

// ── Helpers ─────────────────────────────────────────────────────

fn validate_username(username: &str) -> DomainResult<()> {
    if username.trim().is_empty() {
        return Err(DomainError::Validation("Username must not be empty".into()));
    }
    Ok(())
}

/// Commit on success, roll back on failure. The original error wins over a
/// rollback failure.
pub(crate) async fn finish_transaction<T>(
    tx: Box<dyn IdentityTransaction>,
    result: DomainResult<T>,
) -> DomainResult<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "Transaction rollback failed");
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::identity::{seed_roles, StoreAuthenticator};
    use crate::domain::CredentialStore;
    use crate::infrastructure::crypto::jwt::verify_token;
    use crate::infrastructure::crypto::password::MIN_COST;
    use crate::infrastructure::database::connect_in_memory;
    use crate::infrastructure::{
        BcryptPasswordHasher, InMemoryIdentityStore, JwtConfig, JwtTokenIssuer,
        SeaOrmIdentityStore,
    };

    fn jwt_config() -> JwtConfig {
        JwtConfig {
            secret: "service-test-secret".into(),
            expiration_hours: 1,
            issuer: "event-access-test".into(),
        }
    }

    fn roles(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    async fn build(store: Arc<dyn IdentityStore>) -> AccessControlService {
        seed_roles(store.as_ref(), &roles(&["USER", "ADMIN"]))
            .await
            .unwrap();
        let hasher: Arc<dyn PasswordHasher> = Arc::new(BcryptPasswordHasher::new(MIN_COST));
        let authenticator = Arc::new(StoreAuthenticator::new(store.clone(), hasher.clone()));
        let tokens = Arc::new(JwtTokenIssuer::new(jwt_config()));
        AccessControlService::new(store, hasher, authenticator, tokens)
    }

    async fn memory_service() -> (AccessControlService, Arc<InMemoryIdentityStore>) {
        let store = Arc::new(InMemoryIdentityStore::new());
        (build(store.clone()).await, store)
    }

    async fn register_alice(service: &AccessControlService) -> UserProfile {
        service
            .register(CreateUserDto::new("alice", "pa55word"), &roles(&["ADMIN"]))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn register_hashes_password_and_assigns_roles() {
        let (service, store) = memory_service().await;
        let profile = register_alice(&service).await;
        assert_eq!(profile.roles, vec!["ADMIN"]);

        let stored = store.find_by_username("alice").await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "pa55word");
        let hasher = BcryptPasswordHasher::new(MIN_COST);
        assert!(hasher.matches("pa55word", &stored.password_hash));
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected_regardless_of_roles() {
        let (service, _) = memory_service().await;
        register_alice(&service).await;

        for role_list in [roles(&[]), roles(&["USER"]), roles(&["NOPE"])] {
            let err = service
                .register(CreateUserDto::new("alice", "other"), &role_list)
                .await
                .unwrap_err();
            assert!(matches!(err, DomainError::AlreadyExists { .. }), "{err}");
        }
    }

    #[tokio::test]
    async fn unknown_role_persists_nothing() {
        let (service, store) = memory_service().await;
        let err = service
            .register(
                CreateUserDto::new("bob", "pw"),
                &roles(&["USER", "GHOST", "ALSO_MISSING"]),
            )
            .await
            .unwrap_err();

        match err {
            DomainError::NotFound { entity, value, .. } => {
                assert_eq!(entity, "Role");
                assert_eq!(value, "GHOST");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!store.exists_by_username("bob").await.unwrap());
        assert_eq!(store.user_count(), 0);
    }

    #[tokio::test]
    async fn blank_username_is_a_validation_error() {
        let (service, _) = memory_service().await;
        let err = service
            .register(CreateUserDto::new("   ", "pw"), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn repeated_role_names_are_assigned_once() {
        let (service, _) = memory_service().await;
        let profile = service
            .register(
                CreateUserDto::new("carol", "pw"),
                &roles(&["USER", "ADMIN", "USER"]),
            )
            .await
            .unwrap();
        assert_eq!(profile.roles, vec!["USER", "ADMIN"]);
    }

    #[tokio::test]
    async fn login_returns_token_and_sets_context() {
        let (service, _) = memory_service().await;
        register_alice(&service).await;

        let mut context = SecurityContext::anonymous();
        let session = service
            .login(&LoginCredentials::new("alice", "pa55word"), &mut context)
            .await
            .unwrap();

        assert_eq!(session.roles, vec!["ADMIN"]);
        assert_eq!(context.require_principal().unwrap().username, "alice");
        assert!(context.has_authority("ADMIN"));

        let claims = verify_token(&session.token, &jwt_config()).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.roles, vec!["ADMIN"]);
    }

    #[tokio::test]
    async fn login_with_wrong_password_leaves_context_anonymous() {
        let (service, _) = memory_service().await;
        register_alice(&service).await;

        let mut context = SecurityContext::anonymous();
        let err = service
            .login(&LoginCredentials::new("alice", "wrong"), &mut context)
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::BadCredentials));
        assert!(context.principal().is_none());
    }

    #[tokio::test]
    async fn role_lookup() {
        let (service, _) = memory_service().await;
        service
            .register(CreateUserDto::new("dave", "pw"), &roles(&["USER", "ADMIN"]))
            .await
            .unwrap();

        assert_eq!(
            service.get_role_names_by_username("dave").await.unwrap(),
            vec!["USER", "ADMIN"]
        );
        assert!(matches!(
            service.get_role_names_by_username("nobody").await,
            Err(DomainError::NotFound { entity: "User", .. })
        ));
    }

    #[tokio::test]
    async fn user_without_roles_has_empty_role_list() {
        let (service, _) = memory_service().await;
        service
            .register(CreateUserDto::new("erin", "pw"), &[])
            .await
            .unwrap();
        assert!(service
            .get_role_names_by_username("erin")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn change_password_with_wrong_old_password_keeps_hash() {
        let (service, store) = memory_service().await;
        register_alice(&service).await;
        let before = store.find_by_username("alice").await.unwrap().unwrap();

        let err = service
            .change_password("alice", "wrong", "x")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidCredential(_)));

        let after = store.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(before.password_hash, after.password_hash);
    }

    #[tokio::test]
    async fn change_password_swaps_the_digest() {
        let (service, store) = memory_service().await;
        register_alice(&service).await;

        service
            .change_password("alice", "pa55word", "n3w-pass")
            .await
            .unwrap();

        let stored = store.find_by_username("alice").await.unwrap().unwrap();
        let hasher = BcryptPasswordHasher::new(MIN_COST);
        assert!(hasher.matches("n3w-pass", &stored.password_hash));
        assert!(!hasher.matches("pa55word", &stored.password_hash));
        assert_eq!(stored.role_names(), vec!["ADMIN"]);

        let mut context = SecurityContext::anonymous();
        assert!(service
            .login(&LoginCredentials::new("alice", "n3w-pass"), &mut context)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn change_password_for_unknown_user() {
        let (service, _) = memory_service().await;
        assert!(matches!(
            service.change_password("ghost", "a", "b").await,
            Err(DomainError::NotFound { entity: "User", .. })
        ));
    }

    #[tokio::test]
    async fn alice_walkthrough() {
        let (service, _) = memory_service().await;

        register_alice(&service).await;
        assert!(matches!(
            service
                .register(CreateUserDto::new("alice", "pa55word"), &roles(&["ADMIN"]))
                .await,
            Err(DomainError::AlreadyExists { .. })
        ));

        let mut context = SecurityContext::anonymous();
        assert!(matches!(
            service
                .login(&LoginCredentials::new("alice", "wrong"), &mut context)
                .await,
            Err(DomainError::BadCredentials)
        ));
        assert!(matches!(
            service.change_password("alice", "wrong", "x").await,
            Err(DomainError::InvalidCredential(_))
        ));
    }

    // ── Same flows against SQLite ───────────────────────────────

    async fn sqlite_service() -> (AccessControlService, Arc<SeaOrmIdentityStore>) {
        let db = connect_in_memory().await.unwrap();
        let store = Arc::new(SeaOrmIdentityStore::new(db));
        (build(store.clone()).await, store)
    }

    #[tokio::test]
    async fn sqlite_register_login_and_roles() {
        let (service, _) = sqlite_service().await;
        service
            .register(CreateUserDto::new("alice", "pa55word"), &roles(&["USER", "ADMIN"]))
            .await
            .unwrap();

        let mut context = SecurityContext::anonymous();
        let session = service
            .login(&LoginCredentials::new("alice", "pa55word"), &mut context)
            .await
            .unwrap();
        assert_eq!(session.roles, vec!["USER", "ADMIN"]);
        assert_eq!(
            service.get_role_names_by_username("alice").await.unwrap(),
            vec!["USER", "ADMIN"]
        );
    }

    #[tokio::test]
    async fn sqlite_unknown_role_rolls_back() {
        let (service, store) = sqlite_service().await;
        let err = service
            .register(CreateUserDto::new("bob", "pw"), &roles(&["USER", "GHOST"]))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::NotFound { entity: "Role", .. }));
        assert!(!store.exists_by_username("bob").await.unwrap());
    }

    #[tokio::test]
    async fn sqlite_change_password() {
        let (service, store) = sqlite_service().await;
        service
            .register(CreateUserDto::new("alice", "old"), &roles(&["USER"]))
            .await
            .unwrap();

        assert!(matches!(
            service.change_password("alice", "nope", "new").await,
            Err(DomainError::InvalidCredential(_))
        ));
        service.change_password("alice", "old", "new").await.unwrap();

        let stored = store.find_by_username("alice").await.unwrap().unwrap();
        let hasher = BcryptPasswordHasher::new(MIN_COST);
        assert!(hasher.matches("new", &stored.password_hash));
        assert_eq!(stored.role_names(), vec!["USER"]);
    }
}
