//! # Event Access Service
//!
//! User registration, login (JWT), role lookup and password change.
//!
//! ## Architecture
//!
//! The project follows Clean Architecture principles:
//!
//! - **domain**: entities (`User`, `Role`, `SecurityContext`) and ports
//! - **application**: `AccessControlService` and the store-backed authenticator
//! - **infrastructure**: SeaORM/SQLite and in-memory stores, bcrypt, JWT
//! - **interfaces**: axum REST API with an OpenAPI document
//! - **shared**: errors and shutdown signalling

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use application::AccessControlService;
pub use config::{default_config_path, AppConfig};
pub use infrastructure::{init_database, DatabaseConfig, InMemoryIdentityStore, SeaOrmIdentityStore};
pub use interfaces::create_api_router;
