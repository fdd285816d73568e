use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use persistence::FileKeyValueStore;
use shared::session::SessionSigner;
use sqlx::PgPool;
use tracing::{info, warn};

use sri_invite_api::app::create_app;
use sri_invite_api::config::{self, Config};
use sri_invite_api::middleware::{init_metrics, logging::init_logging};
use sri_invite_api::services::BackendSelector;

/// Connects and migrates the remote database.
///
/// A failure is logged and yields `None`: the server still starts, and
/// remote operations report the backend as unavailable.
async fn connect_remote(config: &config::DatabaseConfig) -> Option<PgPool> {
    let pool = match config.pool_settings().connect().await {
        Ok(pool) => pool,
        Err(e) => {
            warn!(error = %e, "Could not connect to the remote database");
            return None;
        }
    };

    info!("Running database migrations...");
    if let Err(e) = persistence::db::run_migrations(&pool).await {
        warn!(error = %e, "Database migrations failed");
        return None;
    }
    info!("Migrations completed");

    Some(pool)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load()?;

    init_logging(&config.logging)?;
    init_metrics()?;

    info!("Starting SRI invite service v{}", env!("CARGO_PKG_VERSION"));

    let kv = FileKeyValueStore::open(&config.storage.data_dir)
        .await
        .with_context(|| format!("Failed to open data directory {}", config.storage.data_dir))?;

    let remote_configured = config.remote_configured();
    let pool = if remote_configured {
        connect_remote(&config.database).await
    } else {
        None
    };

    let backends = BackendSelector::from_parts(Arc::new(kv), remote_configured, pool.clone());
    info!(backend = backends.backend_type(), "Storage backend selected");

    let sessions = SessionSigner::new(&config.session.secret, config.session.ttl_hours)?;

    let addr = config.socket_addr()?;
    let app = create_app(config, backends, sessions, pool);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
