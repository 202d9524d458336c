//! Immutable market snapshots and the index built over them.
//!
//! A snapshot is built whole from one batched fetch and never mutated. Rows
//! are stored once in an arena (`entries`); the index maps
//! `(sport, team_a, team_b, day)` to arena positions ordered best first.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use serde::Serialize;
use sports_recon_core::{MatchingConfig, RawMarket, Sport, MAX_DATE_WINDOW_DAYS};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::teams::TeamNormalizer;
use crate::ticker::TickerDecoder;
use crate::title::parse_title;

// =============================================================================
// Index Key
// =============================================================================

/// Index key. Team order is as found in the market, not home/away.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexKey {
    pub sport: Sport,
    pub team_a: String,
    pub team_b: String,
    pub date: NaiveDate,
}

impl IndexKey {
    pub fn new(sport: Sport, team_a: impl Into<String>, team_b: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            sport,
            team_a: team_a.into(),
            team_b: team_b.into(),
            date,
        }
    }
}

// =============================================================================
// Date Bucketing
// =============================================================================

/// Maps timestamps to calendar days in each sport's event timezone.
#[derive(Debug, Clone)]
pub struct DateBucketer {
    offsets: HashMap<Sport, FixedOffset>,
    windows: HashMap<Sport, i64>,
}

impl DateBucketer {
    #[must_use]
    pub fn from_config(config: &MatchingConfig) -> Self {
        // Out-of-range offsets are rejected by config validation; any that slip
        // through bucket in UTC.
        let offsets = Sport::ALL
            .into_iter()
            .filter_map(|sport| {
                config
                    .utc_offset_hours(sport)
                    .checked_mul(3600)
                    .and_then(FixedOffset::east_opt)
                    .map(|o| (sport, o))
            })
            .collect();
        let windows = Sport::ALL
            .into_iter()
            .map(|sport| (sport, config.date_window_days(sport).clamp(0, MAX_DATE_WINDOW_DAYS)))
            .collect();
        Self { offsets, windows }
    }

    /// Calendar day of `ts` in the sport's event timezone.
    #[must_use]
    pub fn bucket(&self, sport: Sport, ts: DateTime<Utc>) -> NaiveDate {
        match self.offsets.get(&sport) {
            Some(offset) => ts.with_timezone(offset).date_naive(),
            None => ts.date_naive(),
        }
    }

    #[must_use]
    pub fn window_days(&self, sport: Sport) -> i64 {
        self.windows.get(&sport).copied().unwrap_or(1)
    }

    /// Days from `scheduled day - window` to `scheduled day + window`, in order.
    #[must_use]
    pub fn window(&self, sport: Sport, scheduled: DateTime<Utc>) -> Vec<NaiveDate> {
        let day = self.bucket(sport, scheduled);
        let window = self.window_days(sport);
        (-window..=window)
            .filter_map(|offset| day.checked_add_signed(Duration::days(offset)))
            .collect()
    }

    #[must_use]
    pub fn in_window(&self, sport: Sport, scheduled: DateTime<Utc>, date: NaiveDate) -> bool {
        let day = self.bucket(sport, scheduled);
        (date - day).num_days().abs() <= self.window_days(sport)
    }
}

// =============================================================================
// Ranking
// =============================================================================

/// Best-first order: volume desc, open interest desc, earliest close, ticker.
#[must_use]
pub fn rank_order(a: &RawMarket, b: &RawMarket) -> Ordering {
    b.volume
        .cmp(&a.volume)
        .then_with(|| b.open_interest.cmp(&a.open_interest))
        .then_with(|| a.close_time.cmp(&b.close_time))
        .then_with(|| a.ticker.cmp(&b.ticker))
}

// =============================================================================
// Snapshot
// =============================================================================

/// One active market row plus what the title said about it.
#[derive(Debug, Clone)]
pub struct MarketEntry {
    pub market: RawMarket,
    pub sport: Sport,
    /// Canonical pair from the title, in title order, when both sides resolved.
    pub title_pair: Option<(String, String)>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotStats {
    pub total_rows: usize,
    pub active_rows: usize,
    pub indexed_rows: usize,
    pub skipped_non_sports: usize,
    pub decode_errors: usize,
    /// Rows indexed by their ticker because the title did not resolve.
    pub title_fallbacks: usize,
    /// Rows whose title and ticker named different teams.
    pub title_conflicts: usize,
}

impl SnapshotStats {
    /// Active rows with a known sports series.
    #[must_use]
    pub fn sports_rows(&self) -> usize {
        self.active_rows.saturating_sub(self.skipped_non_sports)
    }

    #[must_use]
    pub fn decode_error_fraction(&self) -> f64 {
        let rows = self.sports_rows();
        if rows == 0 {
            return 0.0;
        }
        self.decode_errors as f64 / rows as f64
    }
}

/// Point-in-time view of all active markets.
#[derive(Debug)]
pub struct MarketSnapshot {
    generation: u64,
    fetched_at: DateTime<Utc>,
    entries: Vec<MarketEntry>,
    index: HashMap<IndexKey, Vec<usize>>,
    stats: SnapshotStats,
}

impl MarketSnapshot {
    /// The placeholder served before the first successful refresh.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            generation: 0,
            fetched_at: DateTime::<Utc>::default(),
            entries: Vec::new(),
            index: HashMap::new(),
            stats: SnapshotStats::default(),
        }
    }

    /// 0 for the placeholder, then increasing by one per successful refresh.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    #[must_use]
    pub fn stats(&self) -> &SnapshotStats {
        &self.stats
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn entry(&self, position: usize) -> Option<&MarketEntry> {
        self.entries.get(position)
    }

    /// Arena positions for one key, best first. Empty if the key is unknown.
    #[must_use]
    pub fn positions(&self, key: &IndexKey) -> &[usize] {
        self.index.get(key).map_or(&[], Vec::as_slice)
    }

    /// Markets under one key, best first.
    pub fn lookup<'a>(&'a self, key: &IndexKey) -> impl Iterator<Item = &'a MarketEntry> + 'a {
        self.positions(key)
            .iter()
            .filter_map(move |&position| self.entries.get(position))
    }

    /// Number of distinct index keys.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.index.len()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Turns one batch of rows into a `MarketSnapshot`.
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    normalizer: Arc<TeamNormalizer>,
    decoder: TickerDecoder,
    bucketer: DateBucketer,
}

impl SnapshotBuilder {
    #[must_use]
    pub fn new(normalizer: Arc<TeamNormalizer>, config: &MatchingConfig) -> Self {
        Self {
            decoder: TickerDecoder::new(Arc::clone(&normalizer)),
            bucketer: DateBucketer::from_config(config),
            normalizer,
        }
    }

    #[must_use]
    pub fn bucketer(&self) -> &DateBucketer {
        &self.bucketer
    }

    #[must_use]
    pub fn build(&self, rows: Vec<RawMarket>, generation: u64, fetched_at: DateTime<Utc>) -> MarketSnapshot {
        let mut stats = SnapshotStats {
            total_rows: rows.len(),
            ..SnapshotStats::default()
        };
        let mut entries = Vec::new();
        let mut index: HashMap<IndexKey, Vec<usize>> = HashMap::new();

        for market in rows {
            if !market.is_active() {
                continue;
            }
            stats.active_rows += 1;

            let Some(sport) = self.decoder.series_sport(&market.ticker) else {
                stats.skipped_non_sports += 1;
                continue;
            };

            let ticker_pair = match self.decoder.decode(&market.ticker) {
                Ok(info) if info.sport == sport => Some((info.team_a, info.team_b)),
                Ok(info) => {
                    stats.decode_errors += 1;
                    warn!(
                        ticker = %market.ticker,
                        series_sport = %sport,
                        decoded_sport = %info.sport,
                        "Ticker decoded to a different sport than its series"
                    );
                    None
                }
                Err(e) => {
                    stats.decode_errors += 1;
                    warn!(ticker = %market.ticker, error = %e, "Failed to decode market ticker");
                    None
                }
            };
            let title_pair = self.title_pair(sport, &market.title);

            let mut pairs: Vec<(String, String)> = Vec::with_capacity(2);
            match (&ticker_pair, &title_pair) {
                (Some(t), Some(p)) if same_pair(t, p) => pairs.push(t.clone()),
                (Some(t), Some(p)) => {
                    stats.title_conflicts += 1;
                    debug!(
                        ticker = %market.ticker,
                        title = %market.title,
                        "Title and ticker name different teams; indexing under both"
                    );
                    pairs.push(t.clone());
                    pairs.push(p.clone());
                }
                (Some(t), None) => {
                    stats.title_fallbacks += 1;
                    pairs.push(t.clone());
                }
                (None, Some(p)) => pairs.push(p.clone()),
                (None, None) => {}
            }

            if pairs.is_empty() {
                continue;
            }

            let date = self.bucketer.bucket(sport, market.close_time);
            let position = entries.len();
            for (team_a, team_b) in pairs {
                index
                    .entry(IndexKey::new(sport, team_a, team_b, date))
                    .or_default()
                    .push(position);
            }
            entries.push(MarketEntry {
                market,
                sport,
                title_pair,
            });
            stats.indexed_rows += 1;
        }

        for positions in index.values_mut() {
            positions.sort_by(|&a, &b| rank_order(&entries[a].market, &entries[b].market));
        }

        MarketSnapshot {
            generation,
            fetched_at,
            entries,
            index,
            stats,
        }
    }

    /// Canonical pair from a title, if both sides resolve to distinct teams.
    fn title_pair(&self, sport: Sport, title: &str) -> Option<(String, String)> {
        let (raw_a, raw_b) = parse_title(title)?;
        let a = self.normalizer.normalize(sport, &raw_a).ok()?;
        let b = self.normalizer.normalize(sport, &raw_b).ok()?;
        (a != b).then(|| (a.to_string(), b.to_string()))
    }
}

fn same_pair(x: &(String, String), y: &(String, String)) -> bool {
    (x.0 == y.0 && x.1 == y.1) || (x.0 == y.1 && x.1 == y.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use sports_recon_core::MarketStatus;

    fn builder() -> SnapshotBuilder {
        SnapshotBuilder::new(
            Arc::new(TeamNormalizer::embedded().unwrap()),
            &MatchingConfig::default(),
        )
    }

    fn market(ticker: &str, title: &str, volume: u64) -> RawMarket {
        RawMarket {
            ticker: ticker.to_string(),
            title: title.to_string(),
            status: MarketStatus::Active,
            yes_price: dec!(0.55),
            no_price: dec!(0.46),
            volume,
            open_interest: 100,
            close_time: Utc.with_ymd_and_hms(2025, 11, 16, 21, 0, 0).unwrap(),
        }
    }

    fn nov16() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 16).unwrap()
    }

    // ==================== Ranking Tests ====================

    #[test]
    fn test_rank_order_tiebreaks() {
        let a = market("A", "", 1000);
        let b = market("B", "", 1050);
        assert_eq!(rank_order(&a, &b), Ordering::Greater);

        let mut c = market("C", "", 1000);
        c.open_interest = 500;
        assert_eq!(rank_order(&c, &a), Ordering::Less);

        let mut d = market("D", "", 1000);
        d.close_time -= Duration::hours(1);
        assert_eq!(rank_order(&d, &a), Ordering::Less);

        assert_eq!(rank_order(&a, &market("Z", "", 1000)), Ordering::Less);
    }

    // ==================== Bucketing Tests ====================

    #[test]
    fn test_bucket_uses_event_timezone() {
        let bucketer = DateBucketer::from_config(&MatchingConfig::default());
        // 02:00 UTC on the 17th is still the evening of the 16th at UTC-5.
        let late = Utc.with_ymd_and_hms(2025, 11, 17, 2, 0, 0).unwrap();
        assert_eq!(bucketer.bucket(Sport::Nba, late), nov16());
    }

    #[test]
    fn test_window_is_plus_minus_configured_days() {
        let mut config = MatchingConfig::default();
        config.sports.insert(
            Sport::Mlb,
            sports_recon_core::SportMatchingConfig {
                date_window_days: Some(0),
                utc_offset_hours: None,
            },
        );
        let bucketer = DateBucketer::from_config(&config);
        let scheduled = Utc.with_ymd_and_hms(2025, 11, 16, 18, 0, 0).unwrap();

        let days = bucketer.window(Sport::Nfl, scheduled);
        assert_eq!(days.len(), 3);
        assert_eq!(days[1], nov16());
        assert_eq!(bucketer.window(Sport::Mlb, scheduled), vec![nov16()]);
        assert!(!bucketer.in_window(Sport::Nfl, scheduled, nov16() + Duration::days(2)));
    }

    #[test]
    fn test_unvalidated_huge_window_is_clamped() {
        let config = MatchingConfig {
            default_date_window_days: i64::MAX,
            ..MatchingConfig::default()
        };
        let bucketer = DateBucketer::from_config(&config);
        let scheduled = Utc.with_ymd_and_hms(2025, 11, 16, 18, 0, 0).unwrap();

        assert_eq!(bucketer.window_days(Sport::Nfl), MAX_DATE_WINDOW_DAYS);
        assert_eq!(bucketer.window(Sport::Nfl, scheduled).len(), 15);
    }

    // ==================== Build Tests ====================

    #[test]
    fn test_build_indexes_by_ticker_pair_and_day() {
        let snapshot = builder().build(
            vec![market("KXNFLGAME-25NOV16KCDEN-KC", "Kansas City at Denver Winner?", 10)],
            1,
            Utc::now(),
        );
        let key = IndexKey::new(Sport::Nfl, "KC", "DEN", nov16());
        assert_eq!(snapshot.positions(&key), &[0]);
        assert_eq!(snapshot.stats().indexed_rows, 1);
        assert_eq!(snapshot.stats().title_fallbacks, 0);
        assert_eq!(
            snapshot.entry(0).unwrap().title_pair,
            Some(("KC".to_string(), "DEN".to_string()))
        );
    }

    #[test]
    fn test_build_appends_duplicates_in_rank_order() {
        let snapshot = builder().build(
            vec![
                market("KXNFLGAME-25NOV16KCDEN-KC", "", 1000),
                market("KXNFLGAME-25NOV16KCDEN-DEN", "", 1050),
            ],
            1,
            Utc::now(),
        );
        let key = IndexKey::new(Sport::Nfl, "KC", "DEN", nov16());
        let tickers: Vec<_> = snapshot.lookup(&key).map(|e| e.market.ticker.as_str()).collect();
        assert_eq!(
            tickers,
            vec!["KXNFLGAME-25NOV16KCDEN-DEN", "KXNFLGAME-25NOV16KCDEN-KC"]
        );
        assert_eq!(snapshot.stats().title_fallbacks, 2);
    }

    #[test]
    fn test_build_skips_closed_and_non_sports_rows() {
        let mut closed = market("KXNFLGAME-25NOV16KCDEN-KC", "", 10);
        closed.status = MarketStatus::Closed;
        let snapshot = builder().build(
            vec![closed, market("KXBTCD-25NOV1617-T100000", "Bitcoin above 100k", 10)],
            1,
            Utc::now(),
        );
        let stats = snapshot.stats();
        assert_eq!(stats.total_rows, 2);
        assert_eq!(stats.active_rows, 1);
        assert_eq!(stats.skipped_non_sports, 1);
        assert_eq!(stats.decode_errors, 0);
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_build_indexes_conflicting_title_under_both_pairs() {
        let snapshot = builder().build(
            vec![market("KXNFLGAME-25NOV16KCDEN-KC", "Raiders at Broncos", 10)],
            1,
            Utc::now(),
        );
        assert_eq!(snapshot.stats().title_conflicts, 1);
        assert_eq!(snapshot.key_count(), 2);
        assert_eq!(
            snapshot.positions(&IndexKey::new(Sport::Nfl, "LV", "DEN", nov16())),
            &[0]
        );
    }

    #[test]
    fn test_build_keeps_title_indexed_row_with_bad_ticker() {
        let snapshot = builder().build(
            vec![market("KXNFLGAME-25NOV16KCDEN-XX", "Chiefs at Broncos", 10)],
            1,
            Utc::now(),
        );
        assert_eq!(snapshot.stats().decode_errors, 1);
        assert_eq!(snapshot.stats().decode_error_fraction(), 1.0);
        assert_eq!(
            snapshot.positions(&IndexKey::new(Sport::Nfl, "KC", "DEN", nov16())),
            &[0]
        );
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = MarketSnapshot::empty();
        assert_eq!(snapshot.generation(), 0);
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.stats().decode_error_fraction(), 0.0);
    }
}
