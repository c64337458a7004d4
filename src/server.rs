//! Server runtime
//!
//! Wires the configured store, password hasher, authenticator and token
//! issuer into an [`AccessControlService`], seeds the role catalogue, and
//! serves the REST API until the shutdown signal fires.

use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusHandle;
use sea_orm::DatabaseConnection;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::application::{seed_roles, AccessControlService, StoreAuthenticator};
use crate::config::{AppConfig, LogFormat, LoggingConfig, SecurityConfig};
use crate::domain::{IdentityStore, PasswordHasher};
use crate::infrastructure::{
    init_database, run_migrations, BcryptPasswordHasher, InMemoryIdentityStore, JwtTokenIssuer,
    SeaOrmIdentityStore,
};
use crate::interfaces::create_api_router;
use crate::shared::{AppError, InfraError, ShutdownSignal};

// ── Logging ────────────────────────────────────────────────────────

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `logging.level`. Calling this twice is harmless;
/// the second subscriber is simply not installed.
pub fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let result = match logging.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).try_init(),
    };

    if result.is_err() {
        warn!("Tracing subscriber already installed");
    }
}

// ── Options ────────────────────────────────────────────────────────

/// Options for starting the service.
pub struct ServerOptions {
    /// Application configuration.
    pub config: AppConfig,
    /// Keep users in memory instead of the configured database.
    pub in_memory: bool,
    /// Run database migrations on startup (default: true).
    pub auto_migrate: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            in_memory: false,
            auto_migrate: true,
        }
    }
}

/// Assemble the service over `store` using the security settings.
pub fn build_service(
    store: Arc<dyn IdentityStore>,
    security: &SecurityConfig,
) -> AccessControlService {
    let hasher: Arc<dyn PasswordHasher> =
        Arc::new(BcryptPasswordHasher::new(security.bcrypt_cost));
    let authenticator = Arc::new(StoreAuthenticator::new(store.clone(), hasher.clone()));
    let tokens = Arc::new(JwtTokenIssuer::new(security.jwt_config()));

    AccessControlService::new(store, hasher, authenticator, tokens)
}

async fn open_store(
    opts: &ServerOptions,
) -> Result<(Arc<dyn IdentityStore>, Option<DatabaseConnection>), AppError> {
    if opts.in_memory {
        warn!("Using in-memory store; users are lost on shutdown");
        return Ok((Arc::new(InMemoryIdentityStore::new()), None));
    }

    let db_config = opts.config.database.to_database_config();
    info!(url = %db_config.url, "Connecting to database");
    let db = init_database(&db_config).await.map_err(InfraError::from)?;

    if opts.auto_migrate {
        info!("Running database migrations...");
        run_migrations(&db).await.map_err(InfraError::from)?;
        info!("Migrations completed");
    }

    Ok((Arc::new(SeaOrmIdentityStore::new(db.clone())), Some(db)))
}

/// Run the service until `shutdown` is triggered.
pub async fn run(
    opts: ServerOptions,
    metrics_handle: Option<PrometheusHandle>,
    shutdown: ShutdownSignal,
) -> Result<(), AppError> {
    let config = &opts.config;
    info!("Starting event access service...");

    let (store, db) = open_store(&opts).await?;

    let seeded = seed_roles(store.as_ref(), &config.roles.seed).await?;
    info!(created = seeded, "Role catalogue ready");

    if config.security.uses_default_secret() {
        warn!("security.jwt_secret is the built-in default; anyone can forge tokens. Set a secret before exposing this service");
    }

    let service = Arc::new(build_service(store, &config.security));
    info!(
        expiration_hours = config.security.jwt_expiration_hours,
        "JWT issuer configured"
    );

    let router = create_api_router(service, config.security.jwt_config(), metrics_handle);

    let addr = config.server.address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("REST API listening on http://{}", addr);
    info!("OpenAPI document at http://{}/api-docs/openapi.json", addr);

    let api_shutdown = shutdown.clone();
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        api_shutdown.wait().await;
        info!("REST API received shutdown signal");
    });
    let mut api_task = tokio::spawn(async move { server.await });

    let grace = Duration::from_secs(config.server.shutdown_timeout);
    let finished = tokio::select! {
        joined = &mut api_task => Some(joined),
        _ = shutdown.wait() => None,
    };
    let served = match finished {
        Some(joined) => joined,
        None => match tokio::time::timeout(grace, &mut api_task).await {
            Ok(joined) => joined,
            Err(_) => {
                warn!(timeout_secs = grace.as_secs(), "In-flight requests did not finish in time");
                api_task.abort();
                Ok(Ok(()))
            }
        },
    };

    match served {
        Ok(result) => result?,
        Err(e) => return Err(std::io::Error::other(e).into()),
    }

    if let Some(db) = db {
        info!("Closing database connections");
        db.close().await.map_err(InfraError::from)?;
    }

    info!("Shutdown complete");
    Ok(())
}
