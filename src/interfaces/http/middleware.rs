//! Bearer-token authentication middleware for Axum
//!
//! Verifies the JWT and stores a [`SecurityContext`] for the caller in the
//! request extensions. Handlers read it with `Extension<SecurityContext>`.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tracing::debug;

use super::common::ApiResponse;
use crate::domain::SecurityContext;
use crate::infrastructure::crypto::jwt::{is_expired_error, verify_token, JwtConfig};

/// Authentication error types
#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
    ExpiredToken,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            Self::MissingToken => "Missing authentication token",
            Self::InvalidToken => "Invalid authentication token",
            Self::ExpiredToken => "Token has expired",
        };
        (
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::<()>::error(message)),
        )
            .into_response()
    }
}

/// Authentication state containing JWT config
#[derive(Clone)]
pub struct AuthState {
    pub jwt_config: JwtConfig,
}

fn extract_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// JWT authentication middleware
pub async fn auth_middleware(
    State(auth_state): State<AuthState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(auth_header) = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    else {
        return AuthError::MissingToken.into_response();
    };

    let Some(token) = extract_token(auth_header) else {
        return AuthError::InvalidToken.into_response();
    };

    match verify_token(token, &auth_state.jwt_config) {
        Ok(claims) => {
            let context = SecurityContext::authenticated(claims.into_identity());
            request.extensions_mut().insert(context);
            next.run(request).await
        }
        Err(e) if is_expired_error(&e) => AuthError::ExpiredToken.into_response(),
        Err(e) => {
            debug!(error = %e, "Rejected bearer token");
            AuthError::InvalidToken.into_response()
        }
    }
}
