//! Schema Migration Binary
//!
//! Creates or updates the jobs, nodes and sockets tables.
//!
//! Usage:
//!   flare-migrate            # create missing tables and columns
//!   flare-migrate --rebuild  # drop and recreate every table

use flare_api::telemetry::{init_tracing, TelemetryConfig};
use flare_api::{migrate, ApiResult, DbClient, DbConfig, MigrationMode};

#[tokio::main]
async fn main() -> ApiResult<()> {
    init_tracing(&TelemetryConfig::from_env()?)?;

    let mode = MigrationMode::from_args(std::env::args().skip(1));
    let db = DbClient::from_config(&DbConfig::from_env())?;
    migrate(&db, mode).await?;

    tracing::info!(mode = %mode, "Migration complete");
    Ok(())
}
