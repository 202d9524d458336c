//! Offline ticker decoding.

use anyhow::Result;
use clap::Args;
use sports_recon_matching::{TickerDecoder, TickerInfo};
use std::path::PathBuf;

use super::context::{load_config, load_normalizer};

/// Arguments for the decode-ticker command.
#[derive(Args, Debug, Clone)]
pub struct DecodeTickerArgs {
    /// Ticker to decode, e.g. KXNFLGAME-25NOV16KCDEN-KC
    pub ticker: String,

    /// Config file path (only the [teams] section is used)
    #[arg(short, long, env = "RECON_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Decodes a ticker against the configured team tables without touching the
/// market store.
///
/// # Errors
/// Returns an error if the team tables fail to load or the ticker is invalid.
pub fn run_decode_ticker(args: &DecodeTickerArgs) -> Result<()> {
    let info = decode(args)?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

fn decode(args: &DecodeTickerArgs) -> Result<TickerInfo> {
    let config = load_config(args.config.as_deref())?;
    let decoder = TickerDecoder::new(load_normalizer(&config)?);
    Ok(decoder.decode(&args.ticker)?)
}
