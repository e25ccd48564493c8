//! flare-jobs API Server Entry Point
//!
//! Bootstraps configuration, opens the store, migrates tables and starts the
//! Axum HTTP server.

use std::sync::Arc;

use flare_api::telemetry::{init_tracing, MeteredBackend, TelemetryConfig};
use flare_api::{
    create_api_router, migrate, ApiConfig, ApiError, ApiResult, AppState, DbClient, DbConfig,
    StoreKind,
};
use flare_storage::{InMemoryBackend, StorageBackend};

#[tokio::main]
async fn main() -> ApiResult<()> {
    init_tracing(&TelemetryConfig::from_env()?)?;

    let api_config = ApiConfig::from_env()?;

    let backend: Arc<dyn StorageBackend> = match api_config.store {
        StoreKind::Postgres => {
            let db = DbClient::from_config(&DbConfig::from_env())?;
            migrate(&db, api_config.migrate_mode).await?;
            Arc::new(db)
        }
        StoreKind::Memory => {
            tracing::warn!("Using the in-memory store; records are lost on exit");
            Arc::new(InMemoryBackend::new())
        }
    };
    let backend = MeteredBackend::new(backend).into_shared();

    let app = create_api_router(AppState::new(backend), &api_config);

    let addr = api_config.bind_addr()?;
    tracing::info!(%addr, store = ?api_config.store, "Starting flare-jobs API server");
    tracing::info!("Try http://{}/ping", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
