use anyhow::{Context, Result};
use sports_recon_core::DatabaseConfig;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

use crate::repositories::MarketRepository;

/// Owns the pooled connection to the market store.
///
/// Only the snapshot refresh path should hold one of these; matching code
/// works from in-memory snapshots and never opens connections.
pub struct DatabaseClient {
    pool: PgPool,
}

impl DatabaseClient {
    /// Creates a client connected to the specified `PostgreSQL` database.
    ///
    /// # Errors
    /// Returns an error if the database connection cannot be established.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.url)
            .await
            .context("connecting to market store")?;

        tracing::info!(
            max_connections = config.max_connections,
            "Market store pool ready"
        );
        Ok(Self { pool })
    }

    /// Builds the market repository on this client's pool.
    #[must_use]
    pub fn markets(&self) -> MarketRepository {
        MarketRepository::new(self.pool.clone())
    }

    /// Closes every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
