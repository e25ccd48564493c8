//! flare-jobs API - REST Layer and PostgreSQL Backend
//!
//! Exposes the Job, Node and Socket collections over HTTP (Axum) and
//! implements [`flare_storage::StorageBackend`] on a deadpool-postgres pool.
//! The in-memory backend from `flare-storage` serves the same routes for
//! development and tests.

pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod macros;
pub mod migrate;
pub mod openapi;
pub mod routes;
pub mod services;
pub mod sql;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use config::{ApiConfig, StoreKind};
pub use db::{DbClient, DbConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use migrate::{migrate, MigrationMode};
pub use openapi::ApiDoc;
pub use routes::create_api_router;
pub use services::{EntityService, JobService, NodeService, SocketService};
pub use state::AppState;
