//! Market store access for the reconciliation service.
//!
//! This crate provides:
//! - Pooled `PostgreSQL` client
//! - Row models for the `markets` table
//! - The batched market repository, exposed as a `MarketSource`

pub mod database;
pub mod models;
pub mod repositories;

pub use database::DatabaseClient;
pub use models::MarketRecord;
pub use repositories::{into_raw_markets, MarketRepository};
