#![allow(dead_code)]

use flare_api::db::{DbClient, DbConfig};
use flare_api::{migrate, MigrationMode};

pub fn test_db_client() -> DbClient {
    let config = DbConfig::from_env();
    DbClient::from_config(&config).expect("Failed to create database client")
}

/// A client over freshly rebuilt tables.
pub async fn fresh_db() -> DbClient {
    let db = test_db_client();
    migrate(&db, MigrationMode::Rebuild)
        .await
        .expect("Failed to rebuild tables");
    db
}
