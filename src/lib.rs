pub mod accounts; // Callable account functions: crearUsuario / actualizarUsuario
pub mod api; // HTTP router, middleware and server
pub mod attempts; // Login lockout counters
pub mod config;
pub mod core_state;
pub mod crypto;
pub mod db;
pub mod gestation; // Gestational age, due date and risk labels
pub mod models;
pub mod prescription; // Printable prescription PDF
pub mod sessions;
pub mod validation;

use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("State error: {0}")]
    Core(#[from] core_state::CoreError),
    #[error("Bootstrap admin failed: {0}")]
    Bootstrap(#[from] accounts::CallableError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Starts the clinic service and blocks until Ctrl-C.
pub async fn run() -> Result<(), StartupError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = config::AppConfig::from_env()?;
    tracing::info!(database = %config.database_path.display(), "opening database");

    let bind_addr = config.bind_addr;
    let core = Arc::new(core_state::CoreState::open(config)?);

    core.with_db(|conn| accounts::bootstrap_admin(conn, &core.config))?;

    match core.prune_audit() {
        Ok(0) => {}
        Ok(pruned) => tracing::info!(pruned, "old audit entries removed"),
        Err(e) => tracing::warn!("Audit pruning failed: {e}"),
    }

    let mut server = api::start_server_on(core, bind_addr).await?;
    tracing::info!(addr = %server.local_addr, "listening");

    tokio::signal::ctrl_c().await?;
    server.shutdown();
    Ok(())
}
