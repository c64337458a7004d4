//! User query handlers

use axum::{
    extract::{Path, State},
    Extension, Json,
};

use super::dto::UserRolesResponse;
use crate::domain::{role::ADMIN_ROLE, DomainError, SecurityContext};
use crate::interfaces::http::common::{ApiError, ApiResponse};
use crate::interfaces::http::modules::auth::AuthHandlerState;

/// Callers may read their own roles; reading someone else's needs `ADMIN`.
#[utoipa::path(
    get,
    path = "/api/v1/users/{username}/roles",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("username" = String, Path, description = "Username to look up")),
    responses(
        (status = 200, description = "Assigned role names", body = ApiResponse<UserRolesResponse>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not allowed to read this user's roles"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_roles(
    State(state): State<AuthHandlerState>,
    Extension(context): Extension<SecurityContext>,
    Path(username): Path<String>,
) -> Result<Json<ApiResponse<UserRolesResponse>>, ApiError> {
    let principal = context.require_principal()?;
    if principal.username != username && !context.has_authority(ADMIN_ROLE) {
        return Err(DomainError::Forbidden(format!(
            "{} may not read roles of {}",
            principal.username, username
        ))
        .into());
    }

    let roles = state.service.get_role_names_by_username(&username).await?;

    Ok(Json(ApiResponse::success(UserRolesResponse { username, roles })))
}
