//! Records shared by the scoreboard side and the market side.
//!
//! `Game` comes from the scoreboard poller and `RawMarket` from the market
//! store; both are consumed read-only by the reconciliation core.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Sport
// =============================================================================

/// Sports covered by the team tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Sport {
    // Lowercase aliases let figment's lowercased env keys select a sport.
    #[serde(alias = "nfl")]
    Nfl,
    #[serde(alias = "nba")]
    Nba,
    #[serde(alias = "mlb")]
    Mlb,
    #[serde(alias = "nhl")]
    Nhl,
}

impl Sport {
    /// Every supported sport, in table order.
    pub const ALL: [Sport; 4] = [Sport::Nfl, Sport::Nba, Sport::Mlb, Sport::Nhl];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nfl => "NFL",
            Self::Nba => "NBA",
            Self::Mlb => "MLB",
            Self::Nhl => "NHL",
        }
    }

    /// File stem used for the per-sport team table (`nfl.toml`).
    #[must_use]
    pub fn table_stem(self) -> &'static str {
        match self {
            Self::Nfl => "nfl",
            Self::Nba => "nba",
            Self::Mlb => "mlb",
            Self::Nhl => "nhl",
        }
    }
}

impl std::fmt::Display for Sport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Sport {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NFL" => Ok(Self::Nfl),
            "NBA" => Ok(Self::Nba),
            "MLB" => Ok(Self::Mlb),
            "NHL" => Ok(Self::Nhl),
            other => Err(anyhow::anyhow!("unknown sport: {other}")),
        }
    }
}

// =============================================================================
// Game (scoreboard side)
// =============================================================================

/// A scheduled or live event as reported by the scoreboard feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub event_id: String,
    pub sport: Sport,
    pub home_team_name: String,
    pub away_team_name: String,
    pub scheduled_time: DateTime<Utc>,
}

impl Game {
    pub fn new(
        event_id: impl Into<String>,
        sport: Sport,
        home_team_name: impl Into<String>,
        away_team_name: impl Into<String>,
        scheduled_time: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            sport,
            home_team_name: home_team_name.into(),
            away_team_name: away_team_name.into(),
            scheduled_time,
        }
    }
}

// =============================================================================
// RawMarket (market side)
// =============================================================================

/// Trading status of a market row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketStatus {
    Active,
    Closed,
}

impl MarketStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Closed => "closed",
        }
    }
}

impl std::str::FromStr for MarketStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" | "open" => Ok(Self::Active),
            "closed" | "settled" | "finalized" => Ok(Self::Closed),
            other => Err(anyhow::anyhow!("unknown market status: {other}")),
        }
    }
}

/// One tradable contract row as stored by the market sync job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMarket {
    pub ticker: String,
    /// Free text, advisory only.
    pub title: String,
    pub status: MarketStatus,
    pub yes_price: Decimal,
    pub no_price: Decimal,
    pub volume: u64,
    pub open_interest: u64,
    pub close_time: DateTime<Utc>,
}

impl RawMarket {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == MarketStatus::Active
    }

    /// Sum of both sides; close to 1.0 for a healthy book.
    #[must_use]
    pub fn price_sum(&self) -> Decimal {
        self.yes_price + self.no_price
    }
}
