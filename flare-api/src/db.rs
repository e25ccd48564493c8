//! Database Connection Pool Module
//!
//! This module provides PostgreSQL connection pooling using deadpool-postgres
//! and the [`StorageBackend`] implementation on top of it. Statements come
//! from [`crate::sql`]; every operation checks out one pooled connection,
//! runs one statement and hands the connection back when the guard drops.

use crate::error::{ApiError, ApiResult};
use crate::sql::{self, Statement};
use ::async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolError, RecyclingMethod, Runtime};
use flare_core::{
    ConstraintError, EntitySchema, FlareError, FlareResult, Query, Record, StorageError, Where,
};
use flare_storage::StorageBackend;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tokio_postgres::error::SqlState;
use tokio_postgres::NoTls;
use tracing::error;

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// How long a caller waits for a pooled connection
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "flare".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("FLARE_DB_HOST").unwrap_or(defaults.host),
            port: std::env::var("FLARE_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            dbname: std::env::var("FLARE_DB_NAME").unwrap_or(defaults.dbname),
            user: std::env::var("FLARE_DB_USER").unwrap_or(defaults.user),
            password: std::env::var("FLARE_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("FLARE_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_size),
            timeout: std::env::var("FLARE_DB_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_cfg = deadpool_postgres::PoolConfig::new(self.max_size);
        pool_cfg.timeouts.wait = Some(self.timeout);
        cfg.pool = Some(pool_cfg);

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))?;

        Ok(pool)
    }
}

// ============================================================================
// DATABASE CLIENT WRAPPER
// ============================================================================

/// Database client that wraps a connection pool.
#[derive(Clone)]
pub struct DbClient {
    pool: Pool,
}

impl std::fmt::Debug for DbClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbClient")
            .field("pool_size", &self.pool_size())
            .finish()
    }
}

impl DbClient {
    /// Create a new database client with the given pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a new database client from configuration.
    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        let pool = config.create_pool()?;
        Ok(Self::new(pool))
    }

    /// Get the current pool size for observability.
    pub fn pool_size(&self) -> usize {
        self.pool.status().size
    }

    /// Get a connection from the pool.
    pub(crate) async fn get_conn(&self) -> FlareResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(pool_error)
    }

    async fn execute(&self, stmt: &Statement) -> FlareResult<u64> {
        let conn = self.get_conn().await?;
        conn.execute(stmt.sql.as_str(), &stmt.param_refs())
            .await
            .map_err(query_error)
    }
}

fn pool_error(err: PoolError) -> FlareError {
    error!("Connection pool error: {:?}", err);
    let reason = err.to_string();
    match err {
        PoolError::Timeout(_) => StorageError::PoolExhausted { reason },
        PoolError::Closed => StorageError::Unavailable { reason },
        _ => StorageError::Connection { reason },
    }
    .into()
}

fn query_error(err: tokio_postgres::Error) -> FlareError {
    error!("Database error: {:?}", err);
    if err.is_closed() {
        StorageError::Connection {
            reason: err.to_string(),
        }
    } else {
        StorageError::Query {
            reason: err.to_string(),
        }
    }
    .into()
}

#[async_trait]
impl StorageBackend for DbClient {
    fn kind(&self) -> &'static str {
        "postgres"
    }

    async fn insert(&self, schema: &EntitySchema, record: &Record) -> FlareResult<()> {
        let stmt = sql::insert(schema, record)?;
        let conn = self.get_conn().await?;
        match conn.execute(stmt.sql.as_str(), &stmt.param_refs()).await {
            Ok(_) => Ok(()),
            Err(e) if e.code() == Some(&SqlState::UNIQUE_VIOLATION) => {
                Err(ConstraintError::DuplicateId {
                    entity: schema.name.to_string(),
                    id: record.id().unwrap_or_default().to_string(),
                }
                .into())
            }
            Err(e) => Err(query_error(e)),
        }
    }

    async fn select(&self, schema: &EntitySchema, query: &Query) -> FlareResult<Vec<Record>> {
        let stmt = sql::select(schema, query)?;
        let conn = self.get_conn().await?;
        let rows = conn
            .query(stmt.sql.as_str(), &stmt.param_refs())
            .await
            .map_err(query_error)?;

        rows.into_iter()
            .map(|row| -> FlareResult<Record> {
                let json: JsonValue = row.try_get(0).map_err(query_error)?;
                let record = Record::from_json(schema, &json).map_err(|e| StorageError::Decode {
                    entity: schema.name.to_string(),
                    reason: e.to_string(),
                })?;
                Ok(record)
            })
            .collect()
    }

    async fn count(&self, schema: &EntitySchema, filter: Option<&Where>) -> FlareResult<u64> {
        let stmt = sql::count(schema, filter)?;
        let conn = self.get_conn().await?;
        let row = conn
            .query_one(stmt.sql.as_str(), &stmt.param_refs())
            .await
            .map_err(query_error)?;
        let count: i64 = row.try_get(0).map_err(query_error)?;
        Ok(count.max(0) as u64)
    }

    async fn update(
        &self,
        schema: &EntitySchema,
        changes: &Record,
        filter: Option<&Where>,
    ) -> FlareResult<u64> {
        self.execute(&sql::update(schema, changes, filter)?).await
    }

    async fn replace(&self, schema: &EntitySchema, id: &str, record: &Record) -> FlareResult<bool> {
        let affected = self.execute(&sql::replace(schema, id, record)?).await?;
        Ok(affected > 0)
    }

    async fn delete(&self, schema: &EntitySchema, filter: Option<&Where>) -> FlareResult<u64> {
        self.execute(&sql::delete(schema, filter)?).await
    }

    async fn ping(&self) -> FlareResult<()> {
        let conn = self.get_conn().await?;
        conn.query_one("SELECT 1", &[]).await.map_err(query_error)?;
        Ok(())
    }
}
