//! API router and OpenAPI document

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::application::AccessControlService;
use crate::infrastructure::crypto::jwt::JwtConfig;
use crate::interfaces::http::common::ApiResponse;
use crate::interfaces::http::middleware::{auth_middleware, AuthState};

use super::modules::{auth, health, metrics, request_id, users};

/// Security scheme modifier for OpenAPI
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT Bearer token from /api/v1/auth/login"))
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::get_current_user,
        auth::change_password,
        users::get_user_roles,
    ),
    components(
        schemas(
            ApiResponse<String>,
            health::HealthResponse,
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::LoginResponse,
            auth::UserInfo,
            auth::CurrentUserResponse,
            auth::ChangePasswordRequest,
            users::UserRolesResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Authentication", description = "Registration, login (JWT), password change"),
        (name = "Users", description = "Role lookup"),
    ),
    info(
        title = "Event Access Service API",
        version = "1.0.0",
        description = "User registration, login and role lookup",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Create the API router with all routes
///
/// `/metrics` is only mounted when a Prometheus recorder handle is given.
pub fn create_api_router(
    service: Arc<AccessControlService>,
    jwt_config: JwtConfig,
    metrics_handle: Option<PrometheusHandle>,
) -> Router {
    let middleware_state = AuthState { jwt_config };
    let auth_state = auth::AuthHandlerState { service };

    // Auth routes (public)
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login));

    // Bearer token required
    let protected_routes = Router::new()
        .route("/auth/me", get(auth::get_current_user))
        .route("/auth/change-password", post(auth::change_password))
        .route("/users/{username}/roles", get(users::get_user_roles))
        .layer(middleware::from_fn_with_state(
            middleware_state,
            auth_middleware,
        ));

    let api_routes = public_routes
        .merge(protected_routes)
        .with_state(auth_state);

    let health_routes = Router::new()
        .route("/health", get(health::health_check))
        .with_state(health::HealthState::new());

    let mut router = Router::new()
        .nest("/api/v1", api_routes)
        .merge(health_routes)
        .route("/api-docs/openapi.json", get(openapi_json));

    if let Some(handle) = metrics_handle {
        router = router.merge(
            Router::new()
                .route("/metrics", get(metrics::prometheus_metrics))
                .with_state(metrics::MetricsState { handle }),
        );
    }

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router
        .layer(middleware::from_fn(metrics::http_metrics_middleware))
        .layer(middleware::from_fn(request_id::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::Service;

    use crate::application::{seed_roles, StoreAuthenticator};
    use crate::domain::{IdentityStore, PasswordHasher, SecurityContext};
    use crate::infrastructure::crypto::password::MIN_COST;
    use crate::infrastructure::{BcryptPasswordHasher, InMemoryIdentityStore, JwtTokenIssuer};

    fn jwt_config() -> JwtConfig {
        JwtConfig {
            secret: "router-test-secret".into(),
            expiration_hours: 1,
            issuer: "event-access-test".into(),
        }
    }

    async fn app() -> Router {
        let store: Arc<dyn IdentityStore> = Arc::new(InMemoryIdentityStore::new());
        seed_roles(store.as_ref(), &["USER".to_string(), "ADMIN".to_string()])
            .await
            .unwrap();
        let hasher: Arc<dyn PasswordHasher> = Arc::new(BcryptPasswordHasher::new(MIN_COST));
        let authenticator = Arc::new(StoreAuthenticator::new(store.clone(), hasher.clone()));
        let tokens = Arc::new(JwtTokenIssuer::new(jwt_config()));
        let service = Arc::new(AccessControlService::new(
            store,
            hasher,
            authenticator,
            tokens,
        ));
        create_api_router(service, jwt_config(), None)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().into_service().call(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    fn post_json(uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_with(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn register(app: &Router, username: &str, password: &str, roles: &[&str]) -> StatusCode {
        let (status, _) = send(
            app,
            post_json(
                "/api/v1/auth/register",
                json!({ "username": username, "password": password, "roles": roles }),
                None,
            ),
        )
        .await;
        status
    }

    async fn login(app: &Router, username: &str, password: &str) -> String {
        let (status, body) = send(
            app,
            post_json(
                "/api/v1/auth/login",
                json!({ "username": username, "password": password }),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["data"]["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn register_returns_created_profile_without_password() {
        let app = app().await;
        let (status, body) = send(
            &app,
            post_json(
                "/api/v1/auth/register",
                json!({ "username": "alice", "password": "pa55word", "roles": ["ADMIN"] }),
                None,
            ),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["username"], "alice");
        assert_eq!(body["data"]["roles"], json!(["ADMIN"]));
        assert!(!body.to_string().contains("pa55word"));
        assert!(body["data"].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let app = app().await;
        assert_eq!(register(&app, "alice", "pa55word", &["USER"]).await, StatusCode::CREATED);
        assert_eq!(register(&app, "alice", "other", &[]).await, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn unknown_role_is_not_found() {
        let app = app().await;
        assert_eq!(
            register(&app, "bob", "secret", &["AUDITOR"]).await,
            StatusCode::NOT_FOUND
        );
        // nothing was persisted
        assert_eq!(register(&app, "bob", "secret", &[]).await, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn invalid_register_body_is_unprocessable() {
        let app = app().await;
        let (status, body) = send(
            &app,
            post_json(
                "/api/v1/auth/register",
                json!({ "username": "", "password": "" }),
                None,
            ),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn login_returns_bearer_token_and_roles() {
        let app = app().await;
        register(&app, "alice", "pa55word", &["ADMIN"]).await;

        let (status, body) = send(
            &app,
            post_json(
                "/api/v1/auth/login",
                json!({ "username": "alice", "password": "pa55word" }),
                None,
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["token_type"], "Bearer");
        assert_eq!(body["data"]["roles"], json!(["ADMIN"]));
        assert!(!body["data"]["token"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn login_exposes_security_context_to_outer_layers() {
        let app = app().await;
        register(&app, "alice", "pa55word", &["ADMIN"]).await;

        let response = app
            .clone()
            .into_service()
            .call(post_json(
                "/api/v1/auth/login",
                json!({ "username": "alice", "password": "pa55word" }),
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let context = response.extensions().get::<SecurityContext>().unwrap();
        assert_eq!(context.principal().unwrap().username, "alice");
        assert!(context.has_authority("ADMIN"));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_look_the_same() {
        let app = app().await;
        register(&app, "alice", "pa55word", &[]).await;

        let (wrong_status, wrong_body) = send(
            &app,
            post_json(
                "/api/v1/auth/login",
                json!({ "username": "alice", "password": "nope" }),
                None,
            ),
        )
        .await;
        let (unknown_status, unknown_body) = send(
            &app,
            post_json(
                "/api/v1/auth/login",
                json!({ "username": "ghost", "password": "nope" }),
                None,
            ),
        )
        .await;

        assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
        assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_body, unknown_body);
    }

    #[tokio::test]
    async fn me_requires_token() {
        let app = app().await;
        register(&app, "alice", "pa55word", &["USER"]).await;
        let token = login(&app, "alice", "pa55word").await;

        let (status, body) = send(&app, get_with("/api/v1/auth/me", Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["username"], "alice");
        assert_eq!(body["data"]["roles"], json!(["USER"]));

        let (status, _) = send(&app, get_with("/api/v1/auth/me", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app, get_with("/api/v1/auth/me", Some("garbage"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn users_read_their_own_roles() {
        let app = app().await;
        register(&app, "alice", "pa55word", &["USER", "ADMIN"]).await;
        let token = login(&app, "alice", "pa55word").await;

        let (status, body) = send(&app, get_with("/api/v1/users/alice/roles", Some(&token))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["roles"], json!(["USER", "ADMIN"]));
    }

    #[tokio::test]
    async fn reading_other_users_roles_needs_admin() {
        let app = app().await;
        register(&app, "alice", "pa55word", &["ADMIN"]).await;
        register(&app, "bob", "hunter2", &["USER"]).await;
        let bob = login(&app, "bob", "hunter2").await;
        let alice = login(&app, "alice", "pa55word").await;

        let (status, _) = send(&app, get_with("/api/v1/users/alice/roles", Some(&bob))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(&app, get_with("/api/v1/users/bob/roles", Some(&alice))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["roles"], json!(["USER"]));

        let (status, _) = send(&app, get_with("/api/v1/users/ghost/roles", Some(&alice))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn change_password_flow() {
        let app = app().await;
        register(&app, "alice", "pa55word", &[]).await;
        let token = login(&app, "alice", "pa55word").await;

        let (status, _) = send(
            &app,
            post_json(
                "/api/v1/auth/change-password",
                json!({ "old_password": "wrong", "new_password": "n3w" }),
                Some(&token),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            post_json(
                "/api/v1/auth/change-password",
                json!({ "old_password": "pa55word", "new_password": "n3w" }),
                Some(&token),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        login(&app, "alice", "n3w").await;
        let (status, _) = send(
            &app,
            post_json(
                "/api/v1/auth/login",
                json!({ "username": "alice", "password": "pa55word" }),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn change_password_requires_token() {
        let app = app().await;
        let (status, _) = send(
            &app,
            post_json(
                "/api/v1/auth/change-password",
                json!({ "old_password": "a", "new_password": "b" }),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn health_and_openapi_are_public() {
        let app = app().await;

        let (status, body) = send(&app, get_with("/health", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (status, body) = send(&app, get_with("/api-docs/openapi.json", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]
            .as_object()
            .unwrap()
            .contains_key("/api/v1/users/{username}/roles"));
    }

    #[tokio::test]
    async fn responses_carry_request_id() {
        let app = app().await;
        let request = Request::builder()
            .uri("/health")
            .header(request_id::REQUEST_ID_HEADER, "req-42")
            .body(Body::empty())
            .unwrap();

        let response = app.clone().into_service().call(request).await.unwrap();

        assert_eq!(
            response.headers().get(request_id::REQUEST_ID_HEADER).unwrap(),
            "req-42"
        );
    }
}
