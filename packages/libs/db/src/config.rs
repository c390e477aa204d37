//! Connection configuration

use std::env;
use std::path::Path;
use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::context::TableDescriptor;
use crate::error::{DbError, Result};

/// Pool configuration
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL connection URL
    pub database_url: String,

    /// Upper bound on pooled connections
    pub max_connections: u32,

    /// Seconds to wait for a free pooled connection
    pub acquire_timeout_secs: u64,
}

impl DbConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: 5,
            acquire_timeout_secs: 30,
        }
    }

    /// Load from `TK_DATABASE_URL` (or `DATABASE_URL`), `TK_DB_MAX_CONNECTIONS`
    /// and `TK_DB_ACQUIRE_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("TK_DATABASE_URL")
            .or_else(|_| env::var("DATABASE_URL"))
            .map_err(|_| DbError::Config {
                message: "TK_DATABASE_URL or DATABASE_URL must be set".to_string(),
            })?;

        Ok(Self {
            database_url,

            max_connections: env::var("TK_DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap_or(5),

            acquire_timeout_secs: env::var("TK_DB_ACQUIRE_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
        })
    }
}

/// Open a pool for the given configuration.
pub async fn connect(config: &DbConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(&config.database_url)
        .await?;
    tracing::debug!(max_connections = config.max_connections, "connected to database");
    Ok(pool)
}

/// Read table descriptors (`[{"tableName": .., "refName": ..}]`) from a JSON file.
pub fn load_descriptors(path: impl AsRef<Path>) -> Result<Vec<TableDescriptor>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
