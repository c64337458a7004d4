//! User aggregate
//!
//! Contains the User entity, the registration DTO and the credential
//! store port.

pub mod model;
pub mod repository;

mod dto_create;

pub use dto_create::CreateUserDto;
pub use model::{User, UserProfile};
pub use repository::CredentialStore;
