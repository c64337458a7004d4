/// A capability label assigned to users.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Role {
    pub id: i32,
    pub name: String,
}

/// Authority that may read any user's roles
pub const ADMIN_ROLE: &str = "ADMIN";
