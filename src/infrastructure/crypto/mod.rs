//! Cryptographic adapters: bcrypt password hashing and JWT issuance

pub mod jwt;
pub mod password;

pub use jwt::{create_token, verify_token, JwtConfig, JwtTokenIssuer, TokenClaims};
pub use password::BcryptPasswordHasher;
