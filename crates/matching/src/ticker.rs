//! Game-winner ticker decoding.
//!
//! Grammar: `<SERIES>-<YYMONDD><TEAM_A><TEAM_B>-<YES_SIDE>`, for example
//! `KXNFLGAME-25NOV16KCDEN-KC`. Team codes are 2 to 4 letters and written
//! without a separator, so the pair is split against the sport's known code
//! set instead of at a fixed width.

use chrono::NaiveDate;
use regex::Regex;
use sports_recon_core::Sport;
use std::sync::{Arc, LazyLock};

use crate::error::TickerParseError;
use crate::teams::TeamNormalizer;
use crate::types::TickerInfo;

static RE_GAME_TICKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z][A-Z0-9]*)-(\d{2})([A-Z]{3})(\d{2})([A-Z]+)-([A-Z]+)$")
        .expect("game ticker pattern is valid")
});

/// Decodes tickers using the team tables for code lookup.
#[derive(Debug, Clone)]
pub struct TickerDecoder {
    normalizer: Arc<TeamNormalizer>,
}

impl TickerDecoder {
    #[must_use]
    pub fn new(normalizer: Arc<TeamNormalizer>) -> Self {
        Self { normalizer }
    }

    /// Sport of the ticker's series tag, if it is a known game series.
    ///
    /// Used to tell non-sports rows apart from malformed sports rows.
    #[must_use]
    pub fn series_sport(&self, ticker: &str) -> Option<Sport> {
        let tag = ticker.trim().split('-').next()?;
        self.normalizer.sport_for_series(tag)
    }

    /// Decodes a ticker.
    ///
    /// # Errors
    /// Returns `TickerParseError` if the ticker violates the grammar, names an
    /// unknown series or date, does not split into two distinct known teams,
    /// or its yes side is neither team.
    pub fn decode(&self, ticker: &str) -> Result<TickerInfo, TickerParseError> {
        let upper = ticker.trim().to_ascii_uppercase();
        if upper.is_empty() {
            return Err(TickerParseError::malformed(ticker, "empty ticker"));
        }
        if upper.split('-').count() != 3 {
            return Err(TickerParseError::malformed(
                ticker,
                "expected three dash-separated segments",
            ));
        }
        let caps = RE_GAME_TICKER.captures(&upper).ok_or_else(|| {
            TickerParseError::malformed(ticker, "does not match <SERIES>-<YYMONDD><TEAMS>-<SIDE>")
        })?;

        let tag = &caps[1];
        let sport = self
            .normalizer
            .sport_for_series(tag)
            .ok_or_else(|| TickerParseError::UnknownSeries {
                ticker: ticker.to_string(),
                tag: tag.to_string(),
            })?;

        let event_date = parse_event_date(&caps[2], &caps[3], &caps[4]).ok_or_else(|| {
            TickerParseError::InvalidDate {
                ticker: ticker.to_string(),
                date: format!("{}{}{}", &caps[2], &caps[3], &caps[4]),
            }
        })?;

        let teams = &caps[5];
        let side = &caps[6];
        let (code_a, code_b) = self.split_teams(ticker, sport, teams, side)?;

        let team_a = self.canonical_id(sport, code_a);
        let team_b = self.canonical_id(sport, code_b);
        let yes_team = if side == code_a {
            team_a.clone()
        } else if side == code_b {
            team_b.clone()
        } else {
            // Alternate code for one of the two teams, e.g. LAR for LA.
            match self.normalizer.team_for_code(sport, side) {
                Some(team) if team.canonical_id == team_a || team.canonical_id == team_b => {
                    team.canonical_id.clone()
                }
                _ => {
                    return Err(TickerParseError::UnknownYesSide {
                        ticker: ticker.to_string(),
                        side: side.to_string(),
                    })
                }
            }
        };

        Ok(TickerInfo {
            sport,
            sport_tag: tag.to_string(),
            event_date,
            team_code_a: code_a.to_string(),
            team_code_b: code_b.to_string(),
            yes_side_code: side.to_string(),
            team_a,
            team_b,
            yes_team,
        })
    }

    fn canonical_id(&self, sport: Sport, code: &str) -> String {
        self.normalizer
            .team_for_code(sport, code)
            .map_or_else(|| code.to_string(), |t| t.canonical_id.clone())
    }

    /// Splits the concatenated team codes at every point where both halves
    /// are known codes for distinct teams. More than one valid split is
    /// resolved by the yes side when possible.
    fn split_teams<'t>(
        &self,
        ticker: &str,
        sport: Sport,
        teams: &'t str,
        side: &str,
    ) -> Result<(&'t str, &'t str), TickerParseError> {
        let splits: Vec<(&str, &str)> = (1..teams.len())
            .map(|i| teams.split_at(i))
            .filter(|(a, b)| {
                match (
                    self.normalizer.team_for_code(sport, a),
                    self.normalizer.team_for_code(sport, b),
                ) {
                    (Some(ta), Some(tb)) => ta.canonical_id != tb.canonical_id,
                    _ => false,
                }
            })
            .collect();

        match splits.as_slice() {
            [] => Err(TickerParseError::UnknownTeams {
                ticker: ticker.to_string(),
                sport,
                teams: teams.to_string(),
            }),
            [only] => Ok(*only),
            many => {
                let by_side: Vec<_> = many
                    .iter()
                    .filter(|(a, b)| *a == side || *b == side)
                    .collect();
                match by_side.as_slice() {
                    [only] => Ok(**only),
                    _ => Err(TickerParseError::AmbiguousTeams {
                        ticker: ticker.to_string(),
                        teams: teams.to_string(),
                    }),
                }
            }
        }
    }
}

fn parse_event_date(yy: &str, mon: &str, dd: &str) -> Option<NaiveDate> {
    let month = match mon {
        "JAN" => 1,
        "FEB" => 2,
        "MAR" => 3,
        "APR" => 4,
        "MAY" => 5,
        "JUN" => 6,
        "JUL" => 7,
        "AUG" => 8,
        "SEP" => 9,
        "OCT" => 10,
        "NOV" => 11,
        "DEC" => 12,
        _ => return None,
    };
    let year = 2000 + yy.parse::<i32>().ok()?;
    let day = dd.parse::<u32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}
