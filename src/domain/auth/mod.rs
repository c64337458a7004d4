//! Authentication values, the request-scoped security context, and the
//! ports for hashing, credential verification and token issuance.

pub mod context;
pub mod model;
pub mod ports;

pub use context::SecurityContext;
pub use model::{AuthenticatedSession, LoginCredentials, VerifiedIdentity};
pub use ports::{Authenticator, PasswordHasher, TokenIssuer};
