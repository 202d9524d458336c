use crate::types::RawMarket;
use anyhow::Result;
use async_trait::async_trait;

/// Batched read access to the market store.
///
/// Implementations must return every active market in one call; callers never
/// query per event or per team.
#[async_trait]
pub trait MarketSource: Send + Sync {
    async fn fetch_active_markets(&self) -> Result<Vec<RawMarket>>;

    fn name(&self) -> &str;
}
