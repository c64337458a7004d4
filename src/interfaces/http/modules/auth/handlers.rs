//! Authentication API handlers

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Extension, Json};

use super::dto::{
    ChangePasswordRequest, CurrentUserResponse, LoginRequest, LoginResponse, RegisterRequest,
    UserInfo,
};
use crate::application::AccessControlService;
use crate::domain::{CreateUserDto, LoginCredentials, SecurityContext};
use crate::interfaces::http::common::{ApiError, ApiResponse, ValidatedJson};

/// State shared by the auth and user handlers
#[derive(Clone)]
pub struct AuthHandlerState {
    pub service: Arc<AccessControlService>,
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Authentication",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = ApiResponse<UserInfo>),
        (status = 404, description = "A requested role does not exist"),
        (status = 409, description = "Username already exists"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn register(
    State(state): State<AuthHandlerState>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserInfo>>), ApiError> {
    let candidate = CreateUserDto::new(request.username, request.password);
    let profile = state.service.register(candidate, &request.roles).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(UserInfo::from(profile))),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Successful login", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid credentials")
    )
)]
/// The established [`SecurityContext`] rides along in the response
/// extensions so outer layers see who logged in.
pub async fn login(
    State(state): State<AuthHandlerState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<(Extension<SecurityContext>, Json<ApiResponse<LoginResponse>>), ApiError> {
    let credentials = LoginCredentials::new(request.username, request.password);
    let mut context = SecurityContext::anonymous();
    let session = state.service.login(&credentials, &mut context).await?;

    Ok((
        Extension(context),
        Json(ApiResponse::success(LoginResponse {
            token: session.token,
            token_type: "Bearer".to_string(),
            roles: session.roles,
        })),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user info", body = ApiResponse<CurrentUserResponse>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn get_current_user(
    Extension(context): Extension<SecurityContext>,
) -> Result<Json<ApiResponse<CurrentUserResponse>>, ApiError> {
    let principal = context.require_principal()?;

    Ok(Json(ApiResponse::success(CurrentUserResponse {
        username: principal.username.clone(),
        roles: principal.authorities.clone(),
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/change-password",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Old password does not match"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "User no longer exists")
    )
)]
pub async fn change_password(
    State(state): State<AuthHandlerState>,
    Extension(context): Extension<SecurityContext>,
    ValidatedJson(request): ValidatedJson<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let principal = context.require_principal()?;

    state
        .service
        .change_password(
            &principal.username,
            &request.old_password,
            &request.new_password,
        )
        .await?;

    Ok(Json(ApiResponse::success(())))
}
