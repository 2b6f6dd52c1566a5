use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::debug;

use emigrator_core::config::DatabaseConfig;
use emigrator_core::error::{EmigratorError, Result};

use super::store::PgStore;

/// Database connection wrapper providing connection pooling.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection from configuration.
    pub async fn from_config(config: &DatabaseConfig) -> Result<Self> {
        let pool = Self::create_pool(config)
            .await
            .map_err(|e| EmigratorError::Database(format!("Failed to connect: {}", e)))?;

        debug!(
            pool_size = config.pool_size,
            statement_timeout_secs = config.statement_timeout_secs,
            "Database pool created"
        );
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn create_pool(config: &DatabaseConfig) -> sqlx::Result<PgPool> {
        let mut options = PgConnectOptions::from_str(&config.url)?;
        if config.statement_timeout_secs > 0 {
            options = options.options([(
                "statement_timeout",
                format!("{}s", config.statement_timeout_secs),
            )]);
        }

        PgPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_secs(config.pool_timeout_secs))
            .connect_with(options)
            .await
    }

    /// The underlying pool.
    pub fn primary(&self) -> &PgPool {
        &self.pool
    }

    /// A `QueryInterface` sharing this pool.
    pub fn store(&self) -> PgStore {
        PgStore::new(self.pool.clone())
    }

    /// Check database connectivity.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| EmigratorError::Database(format!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Close all connections gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Type alias for the pool type.
pub type DatabasePool = PgPool;
