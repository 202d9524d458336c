//! Data models for the market store.
//!
//! Models derive `sqlx::FromRow` for database compatibility and convert into
//! the shared records in `sports-recon-core`.

pub mod market;

pub use market::MarketRecord;
