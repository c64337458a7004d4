use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserRolesResponse {
    pub username: String,
    /// In assignment order
    pub roles: Vec<String>,
}
