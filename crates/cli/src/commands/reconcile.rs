//! One-shot reconciliation of a slate.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use super::context::{load_games, write_results, Runtime};

/// Arguments for the reconcile command.
#[derive(Args, Debug, Clone)]
pub struct ReconcileArgs {
    /// JSON file holding an array of games
    #[arg(long)]
    pub games: PathBuf,

    /// Config file path
    #[arg(short, long, env = "RECON_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Refreshes the market snapshot once, reconciles every game and prints one
/// JSON result per line.
///
/// # Errors
/// Returns an error if setup or the refresh fails, or a sport has no team table.
pub async fn run_reconcile(args: ReconcileArgs) -> Result<()> {
    let games = load_games(&args.games)?;
    let runtime = Runtime::connect(args.config.as_deref()).await?;

    runtime
        .cache
        .refresh_once()
        .await
        .context("refreshing market snapshot")?;

    let results = runtime.reconciler.reconcile_slate(&games)?;
    write_results(&results)?;

    let reliable = results.iter().filter(|r| r.is_reliable()).count();
    tracing::info!(
        games = results.len(),
        reliable,
        unreliable = results.len() - reliable,
        "Slate reconciled"
    );

    runtime.close().await;
    Ok(())
}
