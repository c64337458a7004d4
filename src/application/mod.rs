//! Application layer: use-cases orchestrating the domain ports

pub mod identity;

pub use identity::{seed_roles, AccessControlService, StoreAuthenticator};
