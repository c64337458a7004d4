//! Database repository implementations
//!
//! Query functions are generic over `ConnectionTrait` so the same code runs
//! against the pool and inside a `DatabaseTransaction`.

pub mod identity_store;
pub mod role_repository;
pub mod user_repository;

pub use identity_store::{SeaOrmIdentityStore, SeaOrmIdentityTransaction};
