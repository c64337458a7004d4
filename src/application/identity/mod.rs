//! Identity module: registration, login, role lookup, password change
//!
//! `AccessControlService` orchestrates the use-cases over the domain ports;
//! `StoreAuthenticator` is the default credential check; `bootstrap` seeds
//! the role catalogue at startup.

pub mod authenticator;
pub mod bootstrap;
pub mod service;

pub use authenticator::StoreAuthenticator;
pub use bootstrap::seed_roles;
pub use service::AccessControlService;
