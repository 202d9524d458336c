//! Types produced by ticker decoding, candidate lookup and validation.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sports_recon_core::{RawMarket, Sport};
use std::fmt;

// =============================================================================
// Ticker Info
// =============================================================================

/// Structured view of a game-winner ticker such as `KXNFLGAME-25NOV16KCDEN-KC`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickerInfo {
    pub sport: Sport,
    /// Series tag, e.g. `KXNFLGAME`.
    pub sport_tag: String,
    pub event_date: NaiveDate,
    /// First team code as written in the ticker.
    pub team_code_a: String,
    /// Second team code as written in the ticker.
    pub team_code_b: String,
    /// Code of the team whose win resolves the contract YES.
    pub yes_side_code: String,
    /// Canonical id for `team_code_a`.
    pub team_a: String,
    /// Canonical id for `team_code_b`.
    pub team_b: String,
    /// Canonical id of the YES team; always one of `team_a` / `team_b`.
    pub yes_team: String,
}

impl TickerInfo {
    /// Canonical pair in ticker order.
    #[must_use]
    pub fn team_pair(&self) -> (&str, &str) {
        (&self.team_a, &self.team_b)
    }

    /// True if the ticker names exactly these two teams, in either order.
    #[must_use]
    pub fn covers(&self, home: &str, away: &str) -> bool {
        (self.team_a == home && self.team_b == away) || (self.team_a == away && self.team_b == home)
    }
}

// =============================================================================
// Match Result
// =============================================================================

/// How far a consumer may trust a `MatchResult`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Confidence {
    None,
    Low,
    Medium,
    High,
}

impl Confidence {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a result is not HIGH.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    NoCandidate,
    PriceInconsistent,
    AmbiguousOrStale,
    DisambiguationRequired,
}

impl ReasonCode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoCandidate => "NO_CANDIDATE",
            Self::PriceInconsistent => "PRICE_INCONSISTENT",
            Self::AmbiguousOrStale => "AMBIGUOUS_OR_STALE",
            Self::DisambiguationRequired => "DISAMBIGUATION_REQUIRED",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of reconciling one game against the market snapshot.
///
/// Probabilities are present only for MEDIUM and HIGH results. A LOW result
/// names the contract it would have chosen so an operator can inspect it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub event_id: String,
    pub matched_ticker: Option<String>,
    pub yes_canonical_team: Option<String>,
    pub home_implied_prob: Option<Decimal>,
    pub away_implied_prob: Option<Decimal>,
    pub confidence: Confidence,
    pub reason_code: Option<ReasonCode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl MatchResult {
    /// A NONE result carrying only the reason.
    #[must_use]
    pub fn no_match(event_id: impl Into<String>, reason: ReasonCode) -> Self {
        Self {
            event_id: event_id.into(),
            matched_ticker: None,
            yes_canonical_team: None,
            home_implied_prob: None,
            away_implied_prob: None,
            confidence: Confidence::None,
            reason_code: Some(reason),
            notes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// MEDIUM or HIGH. Consumers must not read probabilities from anything else.
    #[must_use]
    pub fn is_reliable(&self) -> bool {
        self.confidence >= Confidence::Medium
    }
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_reliable() {
            write!(f, "{}: no reliable match ({}", self.event_id, self.confidence)?;
            if let Some(reason) = self.reason_code {
                write!(f, ", {reason}")?;
            }
            return f.write_str(")");
        }

        write!(
            f,
            "{}: {} [{}]",
            self.event_id,
            self.matched_ticker.as_deref().unwrap_or("-"),
            self.confidence
        )?;
        if let (Some(home), Some(away)) = (self.home_implied_prob, self.away_implied_prob) {
            write!(f, " home={home} away={away}")?;
        }
        if let Some(reason) = self.reason_code {
            write!(f, " ({reason})")?;
        }
        Ok(())
    }
}

// =============================================================================
// Candidates
// =============================================================================

/// A market that survived lookup and decoding for a game.
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub market: &'a RawMarket,
    pub ticker: TickerInfo,
}

/// Why a looked-up market was set aside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteReason {
    UnparseableTicker,
    SportMismatch,
    TitleTickerDisagreement,
    DateOutsideWindow,
}

impl NoteReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnparseableTicker => "unparseable ticker",
            Self::SportMismatch => "sport mismatch",
            Self::TitleTickerDisagreement => "title/ticker disagreement",
            Self::DateOutsideWindow => "date outside window",
        }
    }
}

/// A discarded market, kept for data-quality review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisambiguationNote {
    pub ticker: String,
    pub reason: NoteReason,
    pub detail: String,
}

impl fmt::Display for DisambiguationNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.ticker, self.reason.as_str(), self.detail)
    }
}

/// Candidates for one game, ranked best first, plus what was discarded.
#[derive(Debug, Clone)]
pub struct CandidateSet<'a> {
    pub home_team: String,
    pub away_team: String,
    pub candidates: Vec<Candidate<'a>>,
    pub discarded: Vec<DisambiguationNote>,
    pub snapshot_stale: bool,
}

impl<'a> CandidateSet<'a> {
    #[must_use]
    pub fn new(home_team: impl Into<String>, away_team: impl Into<String>, snapshot_stale: bool) -> Self {
        Self {
            home_team: home_team.into(),
            away_team: away_team.into(),
            candidates: Vec::new(),
            discarded: Vec::new(),
            snapshot_stale,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Number of markets discarded because title and ticker named different teams.
    #[must_use]
    pub fn disagreements(&self) -> usize {
        self.discarded
            .iter()
            .filter(|n| n.reason == NoteReason::TitleTickerDisagreement)
            .count()
    }
}
