use crate::types::Sport;
use anyhow::{bail, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Widest date window, in days either side, a sport may configure.
pub const MAX_DATE_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub snapshot: SnapshotConfig,
    pub matching: MatchingConfig,
    pub teams: TeamsConfig,
}

impl AppConfig {
    /// Rejects settings that would make matching meaningless.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        if self.snapshot.refresh_interval_secs == 0 {
            bail!("snapshot.refresh_interval_secs must be positive");
        }
        if self.snapshot.stale_after_intervals == 0 {
            bail!("snapshot.stale_after_intervals must be positive");
        }
        if !(0.0..=1.0).contains(&self.snapshot.max_decode_error_fraction) {
            bail!(
                "snapshot.max_decode_error_fraction must be within [0, 1], got {}",
                self.snapshot.max_decode_error_fraction
            );
        }
        if self.matching.price_sum_min > self.matching.price_sum_max {
            bail!(
                "matching.price_sum_min ({}) exceeds price_sum_max ({})",
                self.matching.price_sum_min,
                self.matching.price_sum_max
            );
        }
        if self.matching.ambiguous_volume_pct < Decimal::ZERO {
            bail!("matching.ambiguous_volume_pct must not be negative");
        }
        for sport in Sport::ALL {
            let window = self.matching.date_window_days(sport);
            if !(0..=MAX_DATE_WINDOW_DAYS).contains(&window) {
                bail!("date window for {sport} must be within 0..={MAX_DATE_WINDOW_DAYS} days, got {window}");
            }
            if self.matching.utc_offset_hours(sport).abs() > 14 {
                bail!("utc offset for {sport} is out of range");
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/markets".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    pub refresh_interval_secs: u64,
    /// Upper bound on the batched fetch; a slower fetch aborts the refresh.
    pub fetch_timeout_secs: u64,
    /// Snapshot age, in refresh intervals, past which it is always stale.
    pub stale_after_intervals: u32,
    /// Fraction of sports rows allowed to fail ticker decoding before a
    /// refresh is rejected.
    pub max_decode_error_fraction: f64,
}

impl SnapshotConfig {
    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    #[must_use]
    pub fn stale_ceiling(&self) -> Duration {
        self.refresh_interval() * self.stale_after_intervals
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 300,
            fetch_timeout_secs: 10,
            stale_after_intervals: 3,
            max_decode_error_fraction: 0.25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Days either side of the scheduled day searched for markets.
    pub default_date_window_days: i64,
    /// Top two candidates closer than this share of volume are ambiguous.
    pub ambiguous_volume_pct: Decimal,
    pub price_sum_min: Decimal,
    pub price_sum_max: Decimal,
    /// Discarded title/ticker disagreements that force LOW confidence.
    pub low_confidence_disagreements: usize,
    /// Event timezone used to bucket timestamps into calendar days.
    pub default_utc_offset_hours: i32,
    pub sports: HashMap<Sport, SportMatchingConfig>,
}

impl MatchingConfig {
    #[must_use]
    pub fn date_window_days(&self, sport: Sport) -> i64 {
        self.sports
            .get(&sport)
            .and_then(|s| s.date_window_days)
            .unwrap_or(self.default_date_window_days)
    }

    #[must_use]
    pub fn utc_offset_hours(&self, sport: Sport) -> i32 {
        self.sports
            .get(&sport)
            .and_then(|s| s.utc_offset_hours)
            .unwrap_or(self.default_utc_offset_hours)
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            default_date_window_days: 1,
            ambiguous_volume_pct: Decimal::new(10, 2),
            price_sum_min: Decimal::new(98, 2),
            price_sum_max: Decimal::new(102, 2),
            low_confidence_disagreements: 2,
            // US Eastern standard time; fixed so bucketing is reproducible.
            default_utc_offset_hours: -5,
            sports: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SportMatchingConfig {
    pub date_window_days: Option<i64>,
    pub utc_offset_hours: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamsConfig {
    /// Directory holding `<sport>.toml` overrides of the embedded tables.
    pub table_dir: Option<PathBuf>,
}
