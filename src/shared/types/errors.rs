use thiserror::Error;

/// Failures surfaced by the access-control core.
///
/// Every variant aborts the current operation before anything is persisted.
/// The HTTP layer maps each one to a status code.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Already exists: {entity} with {field}={value}")]
    AlreadyExists {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Bad credentials")]
    BadCredentials,

    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    #[error("Validation: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Storage: {0}")]
    Storage(String),

    #[error("Crypto: {0}")]
    Crypto(String),
}

impl DomainError {
    pub fn user_not_found(username: &str) -> Self {
        Self::NotFound {
            entity: "User",
            field: "username",
            value: username.to_string(),
        }
    }

    pub fn role_not_found(name: &str) -> Self {
        Self::NotFound {
            entity: "Role",
            field: "name",
            value: name.to_string(),
        }
    }

    pub fn username_taken(username: &str) -> Self {
        Self::AlreadyExists {
            entity: "User",
            field: "username",
            value: username.to_string(),
        }
    }
}

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Infra(#[from] InfraError),

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_the_lookup() {
        let err = DomainError::role_not_found("ADMIN");
        assert_eq!(err.to_string(), "Not found: Role with name=ADMIN");
    }
}
