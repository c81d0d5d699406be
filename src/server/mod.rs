//! Service bootstrap: storage lifecycle, state assembly and the HTTP loop

pub mod db;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::api::http::http_router;
use crate::config::ServiceConfig;
use crate::diagnosis::GeminiProvider;
use crate::history::ScanStore;
use crate::state::AppState;

pub use db::{create_optimized_pool, run_migrations};

/// Open the database and bring the schema up to date
pub async fn open_store(config: &ServiceConfig) -> Result<ScanStore> {
    info!("Connecting to database: {}", config.database_url);
    let pool = create_optimized_pool(&config.database_url, &config.pool_settings())
        .await
        .context("Failed to connect to database")?;

    run_migrations(&pool).await.context("Migration failed")?;
    info!("Database connected successfully");

    Ok(ScanStore::new(pool))
}

/// Assemble request-handler state around an open store
pub fn build_state(store: ScanStore, config: &ServiceConfig) -> Result<AppState> {
    let mut state = AppState::new(store, config.validation);

    match config.gemini_settings() {
        Some(settings) => {
            let provider = GeminiProvider::new(settings).context("Failed to build Gemini client")?;
            info!("Diagnosis provider enabled (Gemini, model {})", config.gemini_model);
            state = state.with_provider(Arc::new(provider));
        }
        None => info!("Diagnosis provider disabled (no GEMINI_API_KEY)"),
    }

    Ok(state)
}

/// Graceful shutdown signal handler for SIGTERM and Ctrl+C
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
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

    info!("Shutdown signal received, draining connections...");
}

/// Run the HTTP server until a shutdown signal arrives
pub async fn run(config: ServiceConfig) -> Result<()> {
    let store = open_store(&config).await?;
    let state = Arc::new(build_state(store.clone(), &config)?);
    let app = http_router(state, config.max_body_bytes);

    let bind_address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {bind_address}"))?;

    info!("Server listening on http://{}", bind_address);
    info!("Validation: {}, body limit: {} bytes", config.validation, config.max_body_bytes);

    let served = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await;

    if let Err(e) = &served {
        error!("Server error: {}", e);
    }

    info!("Closing database pool...");
    store.close().await;
    info!("Shutdown complete");

    served.context("HTTP server failed")
}
