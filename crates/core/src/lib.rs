//! Shared records, configuration and traits for reconciling scoreboard games
//! with prediction-market contracts.

pub mod config;
pub mod config_loader;
pub mod traits;
pub mod types;

pub use config::{
    AppConfig, DatabaseConfig, MatchingConfig, SnapshotConfig, SportMatchingConfig, TeamsConfig,
    MAX_DATE_WINDOW_DAYS,
};
pub use config_loader::{ConfigLoader, DEFAULT_CONFIG_PATH};
pub use traits::MarketSource;
pub use types::{Game, MarketStatus, RawMarket, Sport};
