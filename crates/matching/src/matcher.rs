//! Candidate lookup for one game.
//!
//! Resolves both team names, probes the snapshot index for either team order
//! across the date window, then decodes every hit's ticker to confirm which
//! teams it covers and which side is YES. Markets whose title and ticker
//! disagree are discarded with a note instead of being guessed at.

use sports_recon_core::{Game, MatchingConfig};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::MatchError;
use crate::snapshot::{rank_order, DateBucketer, IndexKey, MarketEntry, MarketSnapshot};
use crate::teams::TeamNormalizer;
use crate::ticker::TickerDecoder;
use crate::types::{Candidate, CandidateSet, DisambiguationNote, NoteReason};

/// Finds and ranks the markets that may settle on a game.
#[derive(Debug, Clone)]
pub struct MatchingEngine {
    normalizer: Arc<TeamNormalizer>,
    decoder: TickerDecoder,
    bucketer: DateBucketer,
}

impl MatchingEngine {
    #[must_use]
    pub fn new(normalizer: Arc<TeamNormalizer>, config: &MatchingConfig) -> Self {
        Self {
            decoder: TickerDecoder::new(Arc::clone(&normalizer)),
            bucketer: DateBucketer::from_config(config),
            normalizer,
        }
    }

    /// Candidates for `game` in `snapshot`, best first.
    ///
    /// # Errors
    /// Returns `MatchError::MissingTeamTable` if no table is loaded for the
    /// game's sport, and `MatchError::Normalization` if either team name is
    /// unknown. One unknown side fails the whole match.
    pub fn find_candidates<'s>(
        &self,
        game: &Game,
        snapshot: &'s MarketSnapshot,
        snapshot_stale: bool,
    ) -> Result<CandidateSet<'s>, MatchError> {
        let sport = game.sport;
        if !self.normalizer.has_sport(sport) {
            return Err(MatchError::MissingTeamTable { sport });
        }
        let home = self.normalizer.normalize(sport, &game.home_team_name)?;
        let away = self.normalizer.normalize(sport, &game.away_team_name)?;

        let mut set = CandidateSet::new(home, away, snapshot_stale);
        if home == away {
            warn!(
                event_id = %game.event_id,
                team = home,
                "Home and away resolve to the same team"
            );
            return Ok(set);
        }

        let mut seen = HashSet::new();
        let mut positions = Vec::new();
        for day in self.bucketer.window(sport, game.scheduled_time) {
            for (a, b) in [(home, away), (away, home)] {
                let key = IndexKey::new(sport, a, b, day);
                for &position in snapshot.positions(&key) {
                    if seen.insert(position) {
                        positions.push(position);
                    }
                }
            }
        }

        for entry in positions.into_iter().filter_map(|p| snapshot.entry(p)) {
            match self.check_entry(game, home, away, entry) {
                Ok(candidate) => set.candidates.push(candidate),
                Err(note) => {
                    warn!(
                        event_id = %game.event_id,
                        ticker = %note.ticker,
                        reason = note.reason.as_str(),
                        detail = %note.detail,
                        "Discarded market candidate"
                    );
                    set.discarded.push(note);
                }
            }
        }

        set.candidates.sort_by(|a, b| rank_order(a.market, b.market));

        debug!(
            event_id = %game.event_id,
            home,
            away,
            candidates = set.candidates.len(),
            discarded = set.discarded.len(),
            "Candidate lookup complete"
        );
        Ok(set)
    }

    fn check_entry<'s>(
        &self,
        game: &Game,
        home: &str,
        away: &str,
        entry: &'s MarketEntry,
    ) -> Result<Candidate<'s>, DisambiguationNote> {
        let ticker = &entry.market.ticker;
        let note = |reason, detail: String| DisambiguationNote {
            ticker: ticker.clone(),
            reason,
            detail,
        };

        let info = self
            .decoder
            .decode(ticker)
            .map_err(|e| note(NoteReason::UnparseableTicker, e.to_string()))?;

        if info.sport != game.sport {
            return Err(note(
                NoteReason::SportMismatch,
                format!("ticker is {}, game is {}", info.sport, game.sport),
            ));
        }
        if !info.covers(home, away) {
            return Err(note(
                NoteReason::TitleTickerDisagreement,
                format!(
                    "ticker names {}/{}, title names {home}/{away}",
                    info.team_a, info.team_b
                ),
            ));
        }
        if let Some((title_a, title_b)) = &entry.title_pair {
            if !info.covers(title_a, title_b) {
                return Err(note(
                    NoteReason::TitleTickerDisagreement,
                    format!(
                        "ticker names {}/{}, title names {title_a}/{title_b}",
                        info.team_a, info.team_b
                    ),
                ));
            }
        }
        if !self
            .bucketer
            .in_window(game.sport, game.scheduled_time, info.event_date)
        {
            return Err(note(
                NoteReason::DateOutsideWindow,
                format!(
                    "ticker date {} is more than {} day(s) from the scheduled day",
                    info.event_date,
                    self.bucketer.window_days(game.sport)
                ),
            ));
        }

        Ok(Candidate {
            market: &entry.market,
            ticker: info,
        })
    }
}
