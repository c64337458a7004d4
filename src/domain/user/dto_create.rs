use std::fmt;

/// Registration candidate. `password` is plaintext until the service
/// replaces it with a digest.
#[derive(Clone)]
pub struct CreateUserDto {
    pub username: String,
    pub password: String,
}

impl CreateUserDto {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for CreateUserDto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateUserDto")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}
