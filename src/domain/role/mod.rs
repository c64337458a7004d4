//! Role aggregate

pub mod model;
pub mod repository;

pub use model::{Role, ADMIN_ROLE};
pub use repository::RoleStore;
