//! Postgres connection lifecycle and schema.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, instrument};

use crate::config::StorageConfig;
use crate::repository::RepositoryError;
use crate::repository::postgres::map_sqlx_error;
use crate::unit_of_work::PostgresUnitOfWorkFactory;

/// Idempotent schema for batches and their allocated order lines.
pub const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS batches (
        reference TEXT PRIMARY KEY,
        sku TEXT NOT NULL,
        purchased_quantity BIGINT NOT NULL CHECK (purchased_quantity > 0),
        eta DATE NULL,
        version BIGINT NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS allocations (
        batch_reference TEXT NOT NULL REFERENCES batches (reference) ON DELETE CASCADE,
        order_id TEXT NOT NULL,
        sku TEXT NOT NULL,
        qty BIGINT NOT NULL CHECK (qty > 0),
        PRIMARY KEY (batch_reference, order_id, sku, qty)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS batches_sku_idx ON batches (sku)",
];

/// Owned connection pool. Created once at startup and closed at shutdown.
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    #[instrument(skip(config), fields(max_connections = config.max_connections), err)]
    pub async fn connect(config: &StorageConfig) -> Result<Self, RepositoryError> {
        let url = config
            .database_url
            .as_deref()
            .ok_or_else(|| RepositoryError::Storage("DATABASE_URL is not configured".to_string()))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;

        info!("connected to postgres");
        Ok(Self { pool })
    }

    /// Apply [`SCHEMA`]; safe to run on every startup.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), RepositoryError> {
        for statement in SCHEMA {
            sqlx::query(*statement)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("migrate", e))?;
        }
        info!(statements = SCHEMA.len(), "schema applied");
        Ok(())
    }

    pub fn unit_of_work_factory(&self) -> PostgresUnitOfWorkFactory {
        PostgresUnitOfWorkFactory::new(self.pool.clone())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("postgres pool closed");
    }
}
