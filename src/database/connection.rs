use crate::config::DatabaseConfig;
use crate::error::{City2TabulaError, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::info;

/// Shared connection pool. Its size bounds how many stages run at once.
pub struct DatabaseConnection {
    pool: PgPool,
}

impl DatabaseConnection {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let database_url = config.database_url();

        info!(
            host = %config.host,
            database = %config.name,
            max_connections = config.max_connections,
            "📊 DATABASE: Connecting"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections.min(config.max_connections))
            .acquire_timeout(config.acquire_timeout())
            .connect(&database_url)
            .await
            .map_err(|e| {
                City2TabulaError::Database(format!("Failed to connect to database: {e}"))
            })?;

        info!("✅ DATABASE: Connection pool established");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<bool> {
        let row = sqlx::query("SELECT 1 as health")
            .fetch_one(&self.pool)
            .await?;

        let health: i32 = row.get("health");
        Ok(health == 1)
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}
