//! Event Access Service: CLI server
//!
//! ```sh
//! # Run with default config (~/.config/event-access/config.toml)
//! event-access
//!
//! # Custom config path and port
//! event-access --config /etc/event-access/config.toml --port 9000
//!
//! # Throwaway in-memory store
//! event-access --in-memory
//!
//! # Validate config without starting
//! event-access --check
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info, warn};

use event_access::config::{default_config_path, AppConfig, LoggingConfig};
use event_access::server::{self, init_tracing, ServerOptions};
use event_access::shared::{listen_for_shutdown_signals, ShutdownSignal};

/// User registration, login and role lookup over a JWT-secured REST API.
#[derive(Parser, Debug)]
#[command(
    name = "event-access",
    version,
    about = "Access-control service: registration, login, role lookup, password change",
    long_about = "Event access service: REST API for user registration, JWT login, \
                  role lookup and password change.\n\n\
                  Default config: ~/.config/event-access/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "EVENT_ACCESS_CONFIG")]
    config: Option<PathBuf>,

    /// Override the REST API listen port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Keep users in memory instead of the configured database.
    #[arg(long)]
    in_memory: bool,

    /// Validate the configuration file and exit without starting the server.
    #[arg(long)]
    check: bool,

    /// Skip database migrations on startup.
    #[arg(long)]
    no_migrate: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // ── Load configuration ─────────────────────────────────────
    let config_path = cli.config.unwrap_or_else(default_config_path);
    // A present but invalid file is fatal; a missing file yields defaults.
    let mut config = match AppConfig::load(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            init_tracing(&LoggingConfig::default());
            error!("Failed to load config from {}: {}", config_path.display(), e);
            return Err(e.into());
        }
    };

    if let Some(port) = cli.port {
        config.server.port = port;
    }

    if cli.check {
        println!("Configuration is valid");
        println!("   Config file : {}", config_path.display());
        println!("   API address : {}", config.server.address());
        println!("   Database    : {}", config.database.url);
        println!("   Log level   : {}", config.logging.level);
        println!("   Seed roles  : {}", config.roles.seed.join(", "));
        if config.security.uses_default_secret() {
            println!("   WARNING     : security.jwt_secret is the built-in default");
        }
        return Ok(());
    }

    // ── Apply CLI overrides ────────────────────────────────────
    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }
    init_tracing(&config.logging);
    info!("Configuration loaded from {}", config_path.display());
    if let Some(port) = cli.port {
        info!("CLI override: port = {}", port);
    }

    // ── Prometheus metrics recorder ────────────────────────────
    let metrics_handle = match metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
    {
        Ok(handle) => {
            info!("Prometheus metrics recorder installed");
            Some(handle)
        }
        Err(e) => {
            warn!("Metrics disabled: {}", e);
            None
        }
    };

    // ── Start server ───────────────────────────────────────────
    let shutdown = ShutdownSignal::new();
    tokio::spawn(listen_for_shutdown_signals(shutdown.clone()));

    let opts = ServerOptions {
        config,
        in_memory: cli.in_memory,
        auto_migrate: !cli.no_migrate,
    };

    if let Err(e) = server::run(opts, metrics_handle, shutdown).await {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
