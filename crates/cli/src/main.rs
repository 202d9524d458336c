use clap::{Parser, Subcommand};

mod commands;

use commands::{DecodeTickerArgs, NormalizeArgs, ReconcileArgs, WatchArgs};

#[derive(Parser)]
#[command(name = "sports-recon")]
#[command(about = "Reconcile scoreboard games with prediction-market contracts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh the market snapshot once and reconcile a slate of games
    Reconcile(ReconcileArgs),
    /// Keep the snapshot refreshed and re-reconcile a slate on an interval
    Watch(WatchArgs),
    /// Decode a game-winner ticker
    DecodeTicker(DecodeTickerArgs),
    /// Resolve a team spelling to its canonical team
    Normalize(NormalizeArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries only results.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let outcome = match cli.command {
        Commands::Reconcile(args) => commands::run_reconcile(args).await,
        Commands::Watch(args) => commands::run_watch(args).await,
        Commands::DecodeTicker(args) => commands::run_decode_ticker(&args),
        Commands::Normalize(args) => commands::run_normalize(&args),
    };

    if let Err(e) = &outcome {
        tracing::error!(error = %format!("{e:#}"), "Command failed");
    }
    outcome
}
