//! Canonical team resolution.
//!
//! Team tables are TOML documents, one per sport, embedded at build time and
//! optionally replaced from `teams.table_dir`. Each table lists every spelling
//! either data source uses for a franchise. Lookup is exact after lowercasing
//! and collapsing whitespace; nothing is guessed.

use figment::{
    providers::{Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use sports_recon_core::{Sport, TeamsConfig};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{NormalizationError, TeamTableError};

const EMBEDDED_TABLES: [(Sport, &str); 4] = [
    (Sport::Nfl, include_str!("../teams/nfl.toml")),
    (Sport::Nba, include_str!("../teams/nba.toml")),
    (Sport::Mlb, include_str!("../teams/mlb.toml")),
    (Sport::Nhl, include_str!("../teams/nhl.toml")),
];

// =============================================================================
// Table Documents
// =============================================================================

/// One per-sport team table as written on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamTableFile {
    pub sport: Sport,
    pub version: String,
    /// Ticker series tags whose markets belong to this sport.
    #[serde(default)]
    pub ticker_series: Vec<String>,
    pub teams: Vec<TeamEntry>,
}

impl TeamTableFile {
    /// Parses a table from TOML source.
    ///
    /// # Errors
    /// Returns `TeamTableError::Parse` if the document does not match the table schema.
    pub fn from_toml_str(origin: &str, source: &str) -> Result<Self, TeamTableError> {
        Figment::from(Toml::string(source))
            .extract()
            .map_err(|e| TeamTableError::parse(origin, e))
    }

    /// Parses a table file from disk.
    ///
    /// # Errors
    /// Returns `TeamTableError::Parse` if the file is missing or malformed.
    pub fn from_path(path: &Path) -> Result<Self, TeamTableError> {
        let origin = path.display().to_string();
        if !path.is_file() {
            return Err(TeamTableError::parse(origin, "file not found"));
        }
        Figment::from(Toml::file(path))
            .extract()
            .map_err(|e| TeamTableError::parse(origin, e))
    }
}

/// One franchise entry in a team table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamEntry {
    /// Canonical id; also the primary ticker code.
    pub id: String,
    pub display_name: String,
    /// Extra ticker codes for this team. Codes are not name spellings; list a
    /// code under `variants` when it names only this franchise.
    #[serde(default)]
    pub codes: Vec<String>,
    #[serde(default)]
    pub variants: Vec<String>,
}

/// A resolved franchise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalTeam {
    pub sport: Sport,
    pub canonical_id: String,
    pub display_name: String,
}

// =============================================================================
// Per-sport index
// =============================================================================

#[derive(Debug)]
struct SportTable {
    version: String,
    teams: BTreeMap<String, CanonicalTeam>,
    /// Normalized spelling -> canonical id.
    by_variant: HashMap<String, String>,
    /// Upper-case ticker code -> canonical id.
    by_code: HashMap<String, String>,
    /// Canonical id -> spellings as written in the table.
    variants: HashMap<String, BTreeSet<String>>,
    codes: BTreeSet<String>,
}

impl SportTable {
    fn build(file: &TeamTableFile) -> Result<Self, TeamTableError> {
        let sport = file.sport;
        let mut table = Self {
            version: file.version.clone(),
            teams: BTreeMap::new(),
            by_variant: HashMap::new(),
            by_code: HashMap::new(),
            variants: HashMap::new(),
            codes: BTreeSet::new(),
        };

        for entry in &file.teams {
            let id = entry.id.trim().to_ascii_uppercase();
            table.teams.insert(
                id.clone(),
                CanonicalTeam {
                    sport,
                    canonical_id: id.clone(),
                    display_name: entry.display_name.clone(),
                },
            );

            let codes = std::iter::once(id.as_str()).chain(entry.codes.iter().map(String::as_str));
            for code in codes {
                let code = code.trim().to_ascii_uppercase();
                if let Some(first) = table.by_code.get(&code) {
                    if *first != id {
                        return Err(TeamTableError::DuplicateCode {
                            sport,
                            code,
                            first: first.clone(),
                            second: id,
                        });
                    }
                }
                table.by_code.insert(code.clone(), id.clone());
                table.codes.insert(code);
            }

            table.add_variant(sport, &id, &entry.display_name)?;
            for variant in &entry.variants {
                table.add_variant(sport, &id, variant)?;
            }
        }

        Ok(table)
    }

    fn add_variant(&mut self, sport: Sport, id: &str, spelling: &str) -> Result<(), TeamTableError> {
        let key = normalize_key(spelling);
        if key.is_empty() {
            return Ok(());
        }
        match self.by_variant.get(&key) {
            Some(first) if first != id => {
                return Err(TeamTableError::DuplicateVariant {
                    sport,
                    variant: spelling.to_string(),
                    first: first.clone(),
                    second: id.to_string(),
                });
            }
            Some(_) => {}
            None => {
                self.by_variant.insert(key, id.to_string());
            }
        }
        self.variants
            .entry(id.to_string())
            .or_default()
            .insert(spelling.trim().to_string());
        Ok(())
    }
}

/// Lowercase and collapse internal whitespace.
fn normalize_key(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// =============================================================================
// TeamNormalizer
// =============================================================================

/// Resolves team spellings to canonical ids, per sport.
///
/// Immutable after construction and shared behind an `Arc`.
#[derive(Debug)]
pub struct TeamNormalizer {
    tables: HashMap<Sport, SportTable>,
    series: HashMap<String, Sport>,
}

impl TeamNormalizer {
    /// Builds a normalizer from parsed tables. A later table for the same
    /// sport replaces an earlier one.
    ///
    /// # Errors
    /// Returns an error if a spelling or code maps to two teams within a
    /// sport, or a series tag is claimed by two sports.
    pub fn from_tables(files: impl IntoIterator<Item = TeamTableFile>) -> Result<Self, TeamTableError> {
        let mut tables = HashMap::new();
        let mut series_owner: HashMap<Sport, Vec<String>> = HashMap::new();

        for file in files {
            let table = SportTable::build(&file)?;
            debug!(
                sport = %file.sport,
                version = %file.version,
                teams = table.teams.len(),
                "Built team table"
            );
            series_owner.insert(
                file.sport,
                file.ticker_series
                    .iter()
                    .map(|s| s.trim().to_ascii_uppercase())
                    .collect(),
            );
            tables.insert(file.sport, table);
        }

        let mut series = HashMap::new();
        let mut owners: Vec<_> = series_owner.into_iter().collect();
        owners.sort_by_key(|(sport, _)| *sport);
        for (sport, tags) in owners {
            for tag in tags {
                if let Some(first) = series.get(&tag) {
                    if *first != sport {
                        return Err(TeamTableError::DuplicateSeries {
                            series: tag,
                            first: *first,
                            second: sport,
                        });
                    }
                }
                series.insert(tag, sport);
            }
        }

        Ok(Self { tables, series })
    }

    /// The tables compiled into the binary.
    ///
    /// # Errors
    /// Returns an error if an embedded table is invalid.
    pub fn embedded() -> Result<Self, TeamTableError> {
        Self::from_tables(embedded_tables()?)
    }

    /// Embedded tables, with any `<sport>.toml` in `config.table_dir` replacing
    /// the embedded one for that sport.
    ///
    /// # Errors
    /// Returns an error if an override cannot be parsed, declares the wrong
    /// sport, or produces conflicting entries.
    pub fn load(config: &TeamsConfig) -> Result<Self, TeamTableError> {
        let mut files = embedded_tables()?;

        if let Some(dir) = &config.table_dir {
            for file in &mut files {
                let expected = file.sport;
                let path = dir.join(format!("{}.toml", expected.table_stem()));
                if !path.is_file() {
                    continue;
                }
                let override_table = TeamTableFile::from_path(&path)?;
                if override_table.sport != expected {
                    return Err(TeamTableError::SportMismatch {
                        origin: path.display().to_string(),
                        expected,
                        found: override_table.sport,
                    });
                }
                info!(
                    sport = %expected,
                    path = %path.display(),
                    version = %override_table.version,
                    "Using team table override"
                );
                *file = override_table;
            }
        }

        Self::from_tables(files)
    }

    /// Resolves a raw spelling to its canonical id.
    ///
    /// # Errors
    /// Returns `NormalizationError` if the spelling is not listed for the sport
    /// (including when no table is loaded for it).
    pub fn normalize(&self, sport: Sport, raw_name: &str) -> Result<&str, NormalizationError> {
        self.tables
            .get(&sport)
            .and_then(|table| table.by_variant.get(&normalize_key(raw_name)))
            .map(String::as_str)
            .ok_or_else(|| NormalizationError::new(sport, raw_name))
    }

    /// Every spelling listed for a canonical team.
    #[must_use]
    pub fn variants(&self, sport: Sport, canonical_id: &str) -> Option<&BTreeSet<String>> {
        self.tables.get(&sport)?.variants.get(canonical_id)
    }

    #[must_use]
    pub fn has_sport(&self, sport: Sport) -> bool {
        self.tables.contains_key(&sport)
    }

    #[must_use]
    pub fn canonical_team(&self, sport: Sport, canonical_id: &str) -> Option<&CanonicalTeam> {
        self.tables.get(&sport)?.teams.get(canonical_id)
    }

    /// Looks up a ticker team code (case-insensitive).
    #[must_use]
    pub fn team_for_code(&self, sport: Sport, code: &str) -> Option<&CanonicalTeam> {
        let table = self.tables.get(&sport)?;
        let id = table.by_code.get(&code.to_ascii_uppercase())?;
        table.teams.get(id)
    }

    /// Known ticker team codes for a sport, upper-case.
    #[must_use]
    pub fn ticker_codes(&self, sport: Sport) -> Option<&BTreeSet<String>> {
        self.tables.get(&sport).map(|t| &t.codes)
    }

    /// Sport owning a ticker series tag such as `KXNFLGAME`.
    #[must_use]
    pub fn sport_for_series(&self, tag: &str) -> Option<Sport> {
        self.series.get(&tag.to_ascii_uppercase()).copied()
    }

    #[must_use]
    pub fn table_version(&self, sport: Sport) -> Option<&str> {
        self.tables.get(&sport).map(|t| t.version.as_str())
    }

    /// Sports with a loaded table.
    pub fn sports(&self) -> impl Iterator<Item = Sport> + '_ {
        self.tables.keys().copied()
    }
}

fn embedded_tables() -> Result<Vec<TeamTableFile>, TeamTableError> {
    EMBEDDED_TABLES
        .iter()
        .map(|(sport, source)| {
            let origin = format!("embedded {}", sport.table_stem());
            let file = TeamTableFile::from_toml_str(&origin, source)?;
            if file.sport != *sport {
                return Err(TeamTableError::SportMismatch {
                    origin,
                    expected: *sport,
                    found: file.sport,
                });
            }
            Ok(file)
        })
        .collect()
}
