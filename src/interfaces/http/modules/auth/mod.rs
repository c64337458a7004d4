//! Authentication module: register, login, current user, password change

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
