//! Shared setup for commands: config, team tables, the market store and the
//! reconciler built on top of them.

use anyhow::{Context, Result};
use sports_recon_core::{AppConfig, ConfigLoader, Game, MarketSource, DEFAULT_CONFIG_PATH};
use sports_recon_data::DatabaseClient;
use sports_recon_matching::{MarketSnapshotCache, MatchResult, Reconciler, TeamNormalizer};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Loads configuration from `path`, or from the default location.
///
/// # Errors
/// Returns an error if the configuration is malformed or invalid.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
    ConfigLoader::load_from(path).with_context(|| format!("loading config from {}", path.display()))
}

/// Loads team tables per the `[teams]` section.
///
/// # Errors
/// Returns an error if a table override is invalid.
pub fn load_normalizer(config: &AppConfig) -> Result<Arc<TeamNormalizer>> {
    let normalizer = TeamNormalizer::load(&config.teams).context("loading team tables")?;
    Ok(Arc::new(normalizer))
}

/// Reads a JSON array of games.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn load_games(path: &Path) -> Result<Vec<Game>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading games from {}", path.display()))?;
    let games: Vec<Game> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing games from {}", path.display()))?;
    tracing::info!(path = %path.display(), games = games.len(), "Loaded slate");
    Ok(games)
}

/// Writes one JSON object per result to stdout.
///
/// # Errors
/// Returns an error if stdout is closed.
pub fn write_results(results: &[MatchResult]) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for result in results {
        writeln!(out, "{}", serde_json::to_string(result)?)?;
    }
    out.flush()?;
    Ok(())
}

/// Everything a reconciling command needs.
pub struct Runtime {
    pub cache: Arc<MarketSnapshotCache>,
    pub reconciler: Reconciler,
    database: DatabaseClient,
}

impl Runtime {
    /// Connects to the market store and builds the cache and reconciler.
    /// The cache is empty until the first refresh.
    ///
    /// # Errors
    /// Returns an error if config, team tables or the database are unavailable.
    pub async fn connect(config_path: Option<&Path>) -> Result<Self> {
        let config = load_config(config_path)?;
        let normalizer = load_normalizer(&config)?;
        let database = DatabaseClient::connect(&config.database).await?;

        let source: Arc<dyn MarketSource> = Arc::new(database.markets());
        let cache = Arc::new(MarketSnapshotCache::new(
            source,
            Arc::clone(&normalizer),
            &config.snapshot,
            &config.matching,
        ));
        let reconciler = Reconciler::new(normalizer, Arc::clone(&cache), &config.matching);

        Ok(Self {
            cache,
            reconciler,
            database,
        })
    }

    pub async fn close(self) {
        self.database.close().await;
    }
}
