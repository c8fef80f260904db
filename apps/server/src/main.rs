//! Till server binary: load config, open the database, rebuild state,
//! serve HTTP until ctrl-c.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use till_db::{Database, DbConfig};
use till_server::config::ServerConfig;
use till_server::media::MediaStore;
use till_server::state::{load_onboarding, AppState};
use till_server::{init_tracing, routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ServerConfig::load().context("loading configuration")?;
    info!(
        addr = %config.http_addr,
        db = %config.database_path.display(),
        media = %config.media_dir.display(),
        "Configuration loaded"
    );

    let db = Database::new(DbConfig::new(&config.database_path))
        .await
        .context("opening database")?;

    let onboarding = load_onboarding(&db)
        .await
        .context("loading onboarding state")?;
    if onboarding.is_complete() {
        info!("Business is onboarded");
    } else {
        info!(step = %onboarding.step(), "Onboarding incomplete; resuming");
    }

    let media = MediaStore::init(&config.media_dir)
        .await
        .context("preparing media directory")?;

    let state = Arc::new(AppState::new(db, onboarding, media));
    let app = routes::router(state);

    let listener = TcpListener::bind(config.http_addr)
        .await
        .with_context(|| format!("binding {}", config.http_addr))?;
    info!(addr = %config.http_addr, "Till server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    info!("Till server stopped");
    Ok(())
}

/// Resolves when the process receives ctrl-c.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    info!("Shutdown signal received");
}
