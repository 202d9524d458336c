//! Market repository.
//!
//! Provides the single batched read used by the snapshot refresh.

use anyhow::Result;
use async_trait::async_trait;
use sports_recon_core::{MarketSource, RawMarket};
use sqlx::PgPool;
use tracing::{debug, warn};

use crate::models::MarketRecord;

/// Repository for reading market rows.
#[derive(Debug, Clone)]
pub struct MarketRepository {
    pool: PgPool,
}

impl MarketRepository {
    /// Creates a new repository instance.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetches every active market row in one query.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn fetch_active(&self) -> Result<Vec<MarketRecord>> {
        let records = sqlx::query_as::<_, MarketRecord>(
            r#"
            SELECT ticker, title, status, yes_price, no_price,
                   volume, open_interest, close_time
            FROM markets
            WHERE status = 'active'
            ORDER BY ticker ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}

/// Converts rows, dropping (and logging) any that violate the record contract.
pub fn into_raw_markets(records: Vec<MarketRecord>) -> Vec<RawMarket> {
    let total = records.len();
    let markets: Vec<RawMarket> = records
        .into_iter()
        .filter_map(|record| match RawMarket::try_from(record) {
            Ok(market) => Some(market),
            Err(e) => {
                warn!(error = %format!("{e:#}"), "Dropping malformed market row");
                None
            }
        })
        .collect();

    if markets.len() < total {
        debug!(
            total,
            kept = markets.len(),
            "Some market rows were dropped during conversion"
        );
    }
    markets
}

#[async_trait]
impl MarketSource for MarketRepository {
    async fn fetch_active_markets(&self) -> Result<Vec<RawMarket>> {
        let records = self.fetch_active().await?;
        Ok(into_raw_markets(records))
    }

    fn name(&self) -> &str {
        "postgres"
    }
}
