//! Offline team-name lookup.

use anyhow::{Context, Result};
use clap::Args;
use sports_recon_core::Sport;
use sports_recon_matching::TeamNormalizer;
use std::collections::BTreeSet;
use std::path::PathBuf;

use super::context::{load_config, load_normalizer};

/// Arguments for the normalize command.
#[derive(Args, Debug, Clone)]
pub struct NormalizeArgs {
    /// League of the team (NFL, NBA, MLB, NHL)
    #[arg(long)]
    pub sport: Sport,

    /// Team spelling as a feed would write it
    pub name: String,

    /// Config file path (only the [teams] section is used)
    #[arg(short, long, env = "RECON_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, serde::Serialize)]
struct Resolved<'a> {
    sport: Sport,
    input: &'a str,
    canonical_id: &'a str,
    display_name: &'a str,
    table_version: Option<&'a str>,
    variants: Option<&'a BTreeSet<String>>,
}

/// Resolves a team spelling and prints its canonical team with every known
/// spelling.
///
/// # Errors
/// Returns an error if the team tables fail to load or the name is unknown.
pub fn run_normalize(args: &NormalizeArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let normalizer = load_normalizer(&config)?;
    let resolved = resolve(&normalizer, args.sport, &args.name)?;
    println!("{}", serde_json::to_string_pretty(&resolved)?);
    Ok(())
}

fn resolve<'a>(normalizer: &'a TeamNormalizer, sport: Sport, name: &'a str) -> Result<Resolved<'a>> {
    let canonical_id = normalizer.normalize(sport, name)?;
    let team = normalizer
        .canonical_team(sport, canonical_id)
        .with_context(|| format!("team table for {sport} lists no team {canonical_id}"))?;

    Ok(Resolved {
        sport,
        input: name,
        canonical_id,
        display_name: &team.display_name,
        table_version: normalizer.table_version(sport),
        variants: normalizer.variants(sport, canonical_id),
    })
}
