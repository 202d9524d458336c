//! Error types for reconciliation.
//!
//! Data-quality problems (unknown spellings, malformed tickers, inconsistent
//! prices) are recoverable and end up in `MatchResult::reason_code`. Only
//! configuration problems surface as `ReconcileError`.

use rust_decimal::Decimal;
use sports_recon_core::Sport;
use thiserror::Error;

/// A team spelling that is not in the sport's table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {sport} team name: {raw_name:?}")]
pub struct NormalizationError {
    pub sport: Sport,
    pub raw_name: String,
}

impl NormalizationError {
    pub fn new(sport: Sport, raw_name: impl Into<String>) -> Self {
        Self {
            sport,
            raw_name: raw_name.into(),
        }
    }
}

/// A ticker that does not follow `<SERIES>-<YYMONDD><TEAM_A><TEAM_B>-<YES_SIDE>`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TickerParseError {
    #[error("malformed ticker {ticker:?}: {reason}")]
    Malformed {
        ticker: String,
        reason: &'static str,
    },

    #[error("unknown series tag {tag:?} in ticker {ticker:?}")]
    UnknownSeries { ticker: String, tag: String },

    #[error("invalid event date {date:?} in ticker {ticker:?}")]
    InvalidDate { ticker: String, date: String },

    #[error("team segment {teams:?} in ticker {ticker:?} is not two known {sport} codes")]
    UnknownTeams {
        ticker: String,
        sport: Sport,
        teams: String,
    },

    #[error("team segment {teams:?} in ticker {ticker:?} splits more than one way")]
    AmbiguousTeams { ticker: String, teams: String },

    #[error("yes side {side:?} in ticker {ticker:?} matches neither team")]
    UnknownYesSide { ticker: String, side: String },
}

impl TickerParseError {
    pub fn malformed(ticker: impl Into<String>, reason: &'static str) -> Self {
        Self::Malformed {
            ticker: ticker.into(),
            reason,
        }
    }

    /// The raw ticker, kept for data-quality review.
    #[must_use]
    pub fn ticker(&self) -> &str {
        match self {
            Self::Malformed { ticker, .. }
            | Self::UnknownSeries { ticker, .. }
            | Self::InvalidDate { ticker, .. }
            | Self::UnknownTeams { ticker, .. }
            | Self::AmbiguousTeams { ticker, .. }
            | Self::UnknownYesSide { ticker, .. } => ticker,
        }
    }
}

/// Problems with a team table. These are configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TeamTableError {
    #[error("failed to parse team table {origin}: {message}")]
    Parse { origin: String, message: String },

    #[error("team table {origin} declares sport {found}, expected {expected}")]
    SportMismatch {
        origin: String,
        expected: Sport,
        found: Sport,
    },

    #[error("{sport} spelling {variant:?} is claimed by both {first} and {second}")]
    DuplicateVariant {
        sport: Sport,
        variant: String,
        first: String,
        second: String,
    },

    #[error("{sport} ticker code {code:?} is claimed by both {first} and {second}")]
    DuplicateCode {
        sport: Sport,
        code: String,
        first: String,
        second: String,
    },

    #[error("ticker series {series:?} is claimed by both {first} and {second}")]
    DuplicateSeries {
        series: String,
        first: Sport,
        second: Sport,
    },
}

impl TeamTableError {
    pub fn parse(origin: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Parse {
            origin: origin.into(),
            message: message.to_string(),
        }
    }
}

/// A candidate whose prices do not sum close to 1.0.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("prices on {ticker} sum to {sum}, outside [{min}, {max}]")]
pub struct PriceValidationError {
    pub ticker: String,
    pub sum: Decimal,
    pub min: Decimal,
    pub max: Decimal,
}

/// Why a snapshot refresh was abandoned. The previous snapshot stays visible.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("market fetch from {source_name} failed: {error:#}")]
    Fetch {
        source_name: String,
        error: anyhow::Error,
    },

    #[error("market fetch timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("{errors} of {rows} sports rows failed ticker decoding (max fraction {max_fraction})")]
    DecodeErrorRate {
        errors: usize,
        rows: usize,
        max_fraction: f64,
    },
}

/// Failure to compute candidates for one game.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error(transparent)]
    Normalization(#[from] NormalizationError),

    #[error("no team table loaded for {sport}")]
    MissingTeamTable { sport: Sport },
}

/// Hard failures of `reconcile()`: configuration only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error("no team table loaded for {sport}")]
    MissingTeamTable { sport: Sport },
}
