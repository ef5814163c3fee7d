//! # Pharmacy API Server
//!
//! REST server for the pharmacy front end.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Pharmacy API Server                              │
//! │                                                                         │
//! │  Browser ───► HTTP (8080) ───► Services ───► SQLite                    │
//! │                                   │                                     │
//! │                                   ▼                                     │
//! │                          dashboard stats cache                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use pharmacy_api::{router, ApiConfig, AppState};
use pharmacy_db::{Database, DbConfig};
use pharmacy_service::{DashboardConfig, Services, StockInConfig};

const DEFAULT_LOG_FILTER: &str =
    "pharmacy_api=info,pharmacy_service=info,pharmacy_db=info,tower_http=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_target(true)
        .init();

    info!("Starting pharmacy API server...");

    // Load configuration
    let config = ApiConfig::load().context("loading configuration")?;
    info!(
        port = config.http_port,
        database = %config.database_path.display(),
        cache_secs = config.dashboard_cache_secs,
        "Configuration loaded"
    );

    // Open database (migrations run on connect)
    let db_config = DbConfig::new(&config.database_path).max_connections(config.db_max_connections);
    let db = Arc::new(Database::new(db_config).await.context("opening database")?);
    info!("Database ready");

    let supplier = db
        .suppliers()
        .ensure(&config.default_supplier)
        .await
        .context("ensuring default supplier")?;
    info!(supplier_id = supplier.id, name = %supplier.name, "Default supplier ready");

    let services = Services::new(
        db.clone(),
        StockInConfig::new(supplier.id),
        DashboardConfig::default().with_cache_ttl(config.dashboard_cache_ttl()),
    );

    // Raise stock alerts for anything that went low or near expiry while down
    match services.alerts.check_and_generate_alerts().await {
        Ok(raised) => info!(raised, "Startup stock alert scan done"),
        Err(e) => warn!(error = %e, "Startup stock alert scan failed"),
    }

    let app = router(AppState::new(services));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "Starting HTTP server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
