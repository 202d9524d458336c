//! Database repositories for the market store.
//!
//! Each repository provides typed access to a specific table.

pub mod market_repo;

pub use market_repo::{into_raw_markets, MarketRepository};
