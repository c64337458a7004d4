//! Infrastructure layer - external concerns

pub mod crypto;
pub mod database;
pub mod storage;

pub use crypto::{BcryptPasswordHasher, JwtConfig, JwtTokenIssuer};
pub use database::{init_database, run_migrations, DatabaseConfig, SeaOrmIdentityStore};
pub use storage::InMemoryIdentityStore;
