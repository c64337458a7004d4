//! Domain layer: entities and ports of the access-control core
//!
//! Nothing in here knows about SeaORM, bcrypt or JWT; adapters live in
//! `infrastructure` and are wired in through the traits below.

pub mod auth;
pub mod role;
pub mod store;
pub mod user;

pub use auth::{
    AuthenticatedSession, Authenticator, LoginCredentials, PasswordHasher, SecurityContext,
    TokenIssuer, VerifiedIdentity,
};
pub use role::{Role, RoleStore};
pub use store::{IdentityStore, IdentityTransaction};
pub use user::{CreateUserDto, CredentialStore, User, UserProfile};

// Re-export errors from shared for convenience
pub use crate::shared::{DomainError, DomainResult};
