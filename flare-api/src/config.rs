//! API Configuration Module
//!
//! Server settings loaded from environment variables with development
//! defaults. Database settings live in [`crate::db::DbConfig`].

use crate::error::{ApiError, ApiResult};
use crate::migrate::MigrationMode;
use std::net::SocketAddr;
use std::str::FromStr;

/// Which storage backend serves requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    #[default]
    Postgres,
    Memory,
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreKind::Postgres),
            "memory" | "in-memory" => Ok(StoreKind::Memory),
            other => Err(format!("unknown store '{}'", other)),
        }
    }
}

// ============================================================================
// API CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host part of the listen address.
    pub bind_host: String,

    pub port: u16,

    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    pub migrate_mode: MigrationMode,

    pub store: StoreKind,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 3000,
            cors_origins: Vec::new(),
            cors_max_age_secs: 86400,
            migrate_mode: MigrationMode::Alter,
            store: StoreKind::Postgres,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `FLARE_API_BIND`: Listen host (default: 0.0.0.0)
    /// - `PORT` or `FLARE_API_PORT`: Listen port (default: 3000)
    /// - `FLARE_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `FLARE_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    /// - `FLARE_MIGRATE_MODE`: `alter`, `rebuild` or `none` (default: alter)
    /// - `FLARE_STORE`: `postgres` or `memory` (default: postgres)
    ///
    /// Unparseable values are errors rather than silent defaults.
    pub fn from_env() -> ApiResult<Self> {
        let defaults = Self::default();

        let port = match std::env::var("PORT")
            .ok()
            .or_else(|| std::env::var("FLARE_API_PORT").ok())
        {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| ApiError::invalid_input(format!("Invalid port value: {}", raw)))?,
            None => defaults.port,
        };

        let cors_origins = std::env::var("FLARE_CORS_ORIGINS")
            .ok()
            .map(|s| parse_origins(&s))
            .unwrap_or_default();

        let cors_max_age_secs = std::env::var("FLARE_CORS_MAX_AGE_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.cors_max_age_secs);

        let migrate_mode = match std::env::var("FLARE_MIGRATE_MODE") {
            Ok(raw) => raw.parse().map_err(ApiError::invalid_input)?,
            Err(_) => defaults.migrate_mode,
        };

        let store = match std::env::var("FLARE_STORE") {
            Ok(raw) => raw.parse().map_err(ApiError::invalid_input)?,
            Err(_) => defaults.store,
        };

        Ok(Self {
            bind_host: std::env::var("FLARE_API_BIND").unwrap_or(defaults.bind_host),
            port,
            cors_origins,
            cors_max_age_secs,
            migrate_mode,
            store,
        })
    }

    pub fn bind_addr(&self) -> ApiResult<SocketAddr> {
        let addr = format!("{}:{}", self.bind_host, self.port);
        addr.parse::<SocketAddr>()
            .map_err(|e| ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e)))
    }

    /// Check if a given origin is allowed.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        if self.cors_origins.is_empty() {
            return true;
        }

        self.cors_origins.iter().any(|allowed| {
            if allowed == origin {
                return true;
            }
            // *.example.com matches any https subdomain
            if let Some(pattern) = allowed.strip_prefix("*.") {
                if let Some(origin_domain) = origin.strip_prefix("https://") {
                    return origin_domain.ends_with(&format!(".{}", pattern));
                }
            }
            false
        })
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect()
}
