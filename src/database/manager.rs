use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::info;

use crate::config;

/// Errors from the database layer
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid column: {0}")]
    InvalidColumn(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Process-wide connection pool. Created lazily on first use from
/// `DATABASE_URL` and shared by every handler.
pub struct Database;

static POOL: OnceCell<PgPool> = OnceCell::const_new();

impl Database {
    pub async fn pool() -> Result<PgPool, DbError> {
        let pool = POOL
            .get_or_try_init(|| async {
                let url = std::env::var("DATABASE_URL")
                    .map_err(|_| DbError::ConfigMissing("DATABASE_URL"))?;
                let cfg = &config::config().database;

                let pool = PgPoolOptions::new()
                    .max_connections(cfg.max_connections)
                    .acquire_timeout(Duration::from_secs(cfg.connection_timeout_secs))
                    .connect(&url)
                    .await?;

                info!("created database pool");
                Ok::<_, DbError>(pool)
            })
            .await?;
        Ok(pool.clone())
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check() -> Result<(), DbError> {
        let pool = Self::pool().await?;
        sqlx::query("SELECT 1").execute(&pool).await?;
        Ok(())
    }

    /// Apply pending migrations from the `migrations/` directory
    pub async fn migrate() -> Result<(), DbError> {
        let pool = Self::pool().await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?;
        info!("migrations applied");
        Ok(())
    }

    /// Close the pool (e.g., on shutdown)
    pub async fn close() {
        if let Some(pool) = POOL.get() {
            pool.close().await;
            info!("closed database pool");
        }
    }
}
