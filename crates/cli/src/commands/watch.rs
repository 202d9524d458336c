//! Continuous reconciliation with a background snapshot refresh.

use anyhow::Result;
use clap::Args;
use sports_recon_core::Game;
use sports_recon_matching::{MatchResult, Reconciler};
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

use super::context::{load_games, write_results, Runtime};

/// Arguments for the watch command.
#[derive(Args, Debug, Clone)]
pub struct WatchArgs {
    /// JSON file holding an array of games
    #[arg(long)]
    pub games: PathBuf,

    /// Config file path
    #[arg(short, long, env = "RECON_CONFIG")]
    pub config: Option<PathBuf>,

    /// Seconds between reconciliation passes
    #[arg(long, default_value_t = 60)]
    pub every_secs: u64,
}

/// Runs the refresh loop and re-reconciles the slate until Ctrl-C.
///
/// # Errors
/// Returns an error if setup fails, a sport has no team table, or results
/// cannot be written.
pub async fn run_watch(args: WatchArgs) -> Result<()> {
    let games = load_games(&args.games)?;
    let runtime = Runtime::connect(args.config.as_deref()).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let refresh = runtime.cache.spawn_refresh_loop(shutdown_rx);

    info!(games = games.len(), every_secs = args.every_secs, "Watching slate");
    let outcome = watch_slate(
        &runtime.reconciler,
        &games,
        Duration::from_secs(args.every_secs.max(1)),
        tokio::signal::ctrl_c(),
        write_results,
    )
    .await;

    // The refresh task may already be gone; nothing to do then.
    let _ = shutdown_tx.send(true);
    if let Err(e) = refresh.await {
        tracing::warn!(error = %e, "Refresh task ended abnormally");
    }
    runtime.close().await;
    outcome
}

/// Re-reconciles `games` every `period` until `stop` resolves, handing each
/// pass to `emit`. Passes are skipped until a snapshot has loaded.
async fn watch_slate<S, E>(
    reconciler: &Reconciler,
    games: &[Game],
    period: Duration,
    stop: S,
    mut emit: E,
) -> Result<()>
where
    S: Future,
    E: FnMut(&[MatchResult]) -> Result<()>,
{
    let mut timer = tokio::time::interval(period);
    tokio::pin!(stop);

    loop {
        tokio::select! {
            _ = timer.tick() => {
                if reconciler.cache().last_success().is_none() {
                    debug!("No market snapshot yet; skipping pass");
                    continue;
                }
                let results = reconciler.reconcile_slate(games)?;
                emit(&results)?;
            }

            _ = &mut stop => {
                info!("Stop requested; shutting down");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sports_recon_core::{MarketSource, MatchingConfig, RawMarket, SnapshotConfig, Sport};
    use sports_recon_matching::{MarketSnapshotCache, TeamNormalizer};
    use std::sync::Arc;

    struct EmptySource;

    #[async_trait]
    impl MarketSource for EmptySource {
        async fn fetch_active_markets(&self) -> Result<Vec<RawMarket>> {
            Ok(Vec::new())
        }

        fn name(&self) -> &str {
            "empty"
        }
    }

    async fn reconciler(loaded: bool) -> Reconciler {
        let normalizer = Arc::new(TeamNormalizer::embedded().unwrap());
        let matching = MatchingConfig::default();
        let cache = Arc::new(MarketSnapshotCache::new(
            Arc::new(EmptySource),
            Arc::clone(&normalizer),
            &SnapshotConfig::default(),
            &matching,
        ));
        if loaded {
            cache.refresh_once().await.unwrap();
        }
        Reconciler::new(normalizer, cache, &matching)
    }

    fn slate() -> Vec<Game> {
        vec![Game::new(
            "401772",
            Sport::Nfl,
            "Denver Broncos",
            "Kansas City Chiefs",
            chrono::Utc::now(),
        )]
    }

    // ==================== Watch Loop Tests ====================

    #[tokio::test]
    async fn test_output_failure_ends_watch_with_error() {
        let reconciler = reconciler(true).await;
        let mut passes = 0;

        let outcome = watch_slate(
            &reconciler,
            &slate(),
            Duration::from_secs(60),
            std::future::pending::<()>(),
            |results| {
                passes += 1;
                assert_eq!(results.len(), 1);
                Err(anyhow::anyhow!("broken pipe"))
            },
        )
        .await;

        assert_eq!(passes, 1);
        assert!(outcome.unwrap_err().to_string().contains("broken pipe"));
    }

    #[tokio::test]
    async fn test_stop_ends_watch_cleanly() {
        let reconciler = reconciler(true).await;
        let outcome = watch_slate(&reconciler, &slate(), Duration::from_secs(60), async {}, |_| Ok(())).await;
        assert!(outcome.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_passes_wait_for_first_snapshot() {
        let reconciler = reconciler(false).await;
        let mut passes = 0;

        let outcome = watch_slate(
            &reconciler,
            &slate(),
            Duration::from_secs(60),
            tokio::time::sleep(Duration::from_secs(150)),
            |_| {
                passes += 1;
                Ok(())
            },
        )
        .await;

        assert!(outcome.is_ok());
        assert_eq!(passes, 0);
    }
}
