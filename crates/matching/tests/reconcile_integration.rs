//! End-to-end reconciliation tests.
//!
//! These drive the public API the way the binary does: an in-memory market
//! source feeds the snapshot cache, and games are reconciled against it.
//! Covered:
//! - The reference NFL game and ticker reconcile to a HIGH match
//! - Unknown team spellings surface as NONE, never as a guess
//! - Duplicate markets rank deterministically by volume
//! - Price-sum boundaries
//! - Staleness past the refresh ceiling downgrades confidence
//! - Repeated calls against one snapshot are identical

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sports_recon_core::{Game, MarketSource, MarketStatus, MatchingConfig, RawMarket, SnapshotConfig, Sport};
use sports_recon_matching::{
    Confidence, MarketSnapshotCache, ReasonCode, ReconcileError, Reconciler, TeamNormalizer,
    TeamTableFile, TickerDecoder, TickerParseError,
};
use std::sync::Arc;

// =============================================================================
// Helper Functions
// =============================================================================

/// In-memory market store.
#[derive(Default)]
struct InMemorySource {
    rows: Mutex<Vec<RawMarket>>,
}

impl InMemorySource {
    fn with_rows(rows: Vec<RawMarket>) -> Arc<Self> {
        Arc::new(Self {
            rows: Mutex::new(rows),
        })
    }
}

#[async_trait]
impl MarketSource for InMemorySource {
    async fn fetch_active_markets(&self) -> Result<Vec<RawMarket>> {
        Ok(self.rows.lock().clone())
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

fn kickoff() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 16, 18, 0, 0).unwrap()
}

fn broncos_chiefs() -> Game {
    Game::new(
        "401772",
        Sport::Nfl,
        "Denver Broncos",
        "Kansas City Chiefs",
        kickoff(),
    )
}

fn market(ticker: &str, yes: Decimal, no: Decimal, volume: u64) -> RawMarket {
    RawMarket {
        ticker: ticker.to_string(),
        title: "Kansas City at Denver Winner?".to_string(),
        status: MarketStatus::Active,
        yes_price: yes,
        no_price: no,
        volume,
        open_interest: volume / 4,
        close_time: kickoff() + Duration::hours(4),
    }
}

async fn reconciler_with(rows: Vec<RawMarket>) -> Reconciler {
    let normalizer = Arc::new(TeamNormalizer::embedded().unwrap());
    let config = MatchingConfig::default();
    let cache = Arc::new(MarketSnapshotCache::new(
        InMemorySource::with_rows(rows),
        Arc::clone(&normalizer),
        &SnapshotConfig::default(),
        &config,
    ));
    cache.refresh_once().await.unwrap();
    Reconciler::new(normalizer, cache, &config)
}

// =============================================================================
// Reference Scenario
// =============================================================================

#[test]
fn test_reference_ticker_decodes() {
    let decoder = TickerDecoder::new(Arc::new(TeamNormalizer::embedded().unwrap()));
    let info = decoder.decode("KXNFLGAME-25NOV16KCDEN-KC").unwrap();

    assert_eq!(info.sport, Sport::Nfl);
    assert_eq!(info.event_date, NaiveDate::from_ymd_opt(2025, 11, 16).unwrap());
    assert_eq!((info.team_code_a.as_str(), info.team_code_b.as_str()), ("KC", "DEN"));
    assert_eq!(info.yes_side_code, "KC");
}

#[tokio::test]
async fn test_reference_game_reconciles_high() {
    let reconciler = reconciler_with(vec![market(
        "KXNFLGAME-25NOV16KCDEN-KC",
        dec!(0.57),
        dec!(0.44),
        125_000,
    )])
    .await;

    let result = reconciler.reconcile(&broncos_chiefs()).unwrap();

    assert_eq!(result.event_id, "401772");
    assert_eq!(result.matched_ticker.as_deref(), Some("KXNFLGAME-25NOV16KCDEN-KC"));
    assert_eq!(result.yes_canonical_team.as_deref(), Some("KC"));
    assert_eq!(result.confidence, Confidence::High);
    assert_eq!(result.reason_code, None);
    // KC is the away team and the YES side.
    assert_eq!(result.away_implied_prob, Some(dec!(0.57)));
    assert_eq!(result.home_implied_prob, Some(dec!(0.44)));
}

#[tokio::test]
async fn test_unknown_team_name_is_none_not_a_guess() {
    let reconciler = reconciler_with(vec![market(
        "KXNFLGAME-25NOV16KCDEN-KC",
        dec!(0.57),
        dec!(0.44),
        100,
    )])
    .await;
    let mut game = broncos_chiefs();
    game.away_team_name = "New".to_string();

    let result = reconciler.reconcile(&game).unwrap();

    assert_eq!(result.confidence, Confidence::None);
    assert_eq!(result.reason_code, Some(ReasonCode::NoCandidate));
    assert!(result.matched_ticker.is_none());
    assert!(result.home_implied_prob.is_none());
    assert!(result.to_string().contains("no reliable match"));
}

// =============================================================================
// Ranking and Validation
// =============================================================================

#[tokio::test]
async fn test_higher_volume_market_selected_deterministically() {
    let reconciler = reconciler_with(vec![
        market("KXNFLGAME-25NOV16KCDEN-KC", dec!(0.57), dec!(0.44), 1000),
        market("KXNFLGAME-25NOV16KCDEN-DEN", dec!(0.44), dec!(0.57), 1050),
    ])
    .await;

    for _ in 0..10 {
        let result = reconciler.reconcile(&broncos_chiefs()).unwrap();
        assert_eq!(result.matched_ticker.as_deref(), Some("KXNFLGAME-25NOV16KCDEN-DEN"));
        assert_eq!(result.yes_canonical_team.as_deref(), Some("DEN"));
        // Within 10% volume of each other.
        assert_eq!(result.confidence, Confidence::Medium);
        assert_eq!(result.reason_code, Some(ReasonCode::AmbiguousOrStale));
    }
}

#[tokio::test]
async fn test_price_sum_boundary_accepted() {
    let reconciler = reconciler_with(vec![market(
        "KXNFLGAME-25NOV16KCDEN-KC",
        dec!(0.50),
        dec!(0.52),
        100,
    )])
    .await;

    let result = reconciler.reconcile(&broncos_chiefs()).unwrap();
    assert_eq!(result.confidence, Confidence::High);
}

#[tokio::test]
async fn test_price_sum_past_boundary_rejected() {
    let reconciler = reconciler_with(vec![market(
        "KXNFLGAME-25NOV16KCDEN-KC",
        dec!(0.50),
        dec!(0.53),
        100,
    )])
    .await;

    let result = reconciler.reconcile(&broncos_chiefs()).unwrap();
    assert_eq!(result.confidence, Confidence::None);
    assert_eq!(result.reason_code, Some(ReasonCode::PriceInconsistent));
}

#[tokio::test]
async fn test_repeated_title_disagreements_give_low() {
    let mut wrong_ticker = market("KXNFLGAME-25NOV16LVDEN-LV", dec!(0.40), dec!(0.61), 900);
    wrong_ticker.title = "Chiefs at Broncos".to_string();
    let mut wrong_title = market("KXNFLGAME-25NOV16KCDEN-DEN", dec!(0.44), dec!(0.57), 800);
    wrong_title.title = "Raiders at Broncos".to_string();

    let reconciler = reconciler_with(vec![
        market("KXNFLGAME-25NOV16KCDEN-KC", dec!(0.57), dec!(0.44), 100),
        wrong_ticker,
        wrong_title,
    ])
    .await;

    let result = reconciler.reconcile(&broncos_chiefs()).unwrap();
    assert_eq!(result.confidence, Confidence::Low);
    assert_eq!(result.reason_code, Some(ReasonCode::DisambiguationRequired));
    assert_eq!(result.matched_ticker.as_deref(), Some("KXNFLGAME-25NOV16KCDEN-KC"));
    assert!(result.home_implied_prob.is_none());
    assert_eq!(result.notes.len(), 2);
}

// =============================================================================
// Staleness and Idempotence
// =============================================================================

#[tokio::test]
async fn test_sixteen_minute_old_snapshot_downgrades_to_medium() {
    let reconciler = reconciler_with(vec![market(
        "KXNFLGAME-25NOV16KCDEN-KC",
        dec!(0.57),
        dec!(0.44),
        125_000,
    )])
    .await;
    let fetched = reconciler.cache().last_success().unwrap();
    let later = fetched + Duration::minutes(16);

    assert!(reconciler.cache().is_stale_at(later));
    let result = reconciler.reconcile_at(&broncos_chiefs(), later).unwrap();
    assert_eq!(result.confidence, Confidence::Medium);
    assert_eq!(result.reason_code, Some(ReasonCode::AmbiguousOrStale));
    assert!(result.is_reliable());
}

#[tokio::test]
async fn test_reconcile_is_idempotent() {
    let reconciler = reconciler_with(vec![
        market("KXNFLGAME-25NOV16KCDEN-KC", dec!(0.57), dec!(0.44), 5000),
        market("KXNFLGAME-25NOV16KCDEN-DEN", dec!(0.44), dec!(0.57), 1000),
        market("KXNFLGAME-25NOV17KCDEN-KC", dec!(0.90), dec!(0.90), 10),
    ])
    .await;
    let game = broncos_chiefs();
    let now = reconciler.cache().last_success().unwrap();

    let first = reconciler.reconcile_at(&game, now).unwrap();
    let second = reconciler.reconcile_at(&game, now).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[tokio::test]
async fn test_slate_mixes_outcomes_without_failing() {
    let reconciler = reconciler_with(vec![market(
        "KXNFLGAME-25NOV16KCDEN-KC",
        dec!(0.57),
        dec!(0.44),
        100,
    )])
    .await;
    let mut unknown = broncos_chiefs();
    unknown.event_id = "401773".to_string();
    unknown.home_team_name = "Springfield Atoms".to_string();
    let mut unlisted = broncos_chiefs();
    unlisted.event_id = "401774".to_string();
    unlisted.sport = Sport::Nba;
    unlisted.home_team_name = "Boston Celtics".to_string();
    unlisted.away_team_name = "Los Angeles Lakers".to_string();

    let results = reconciler
        .reconcile_slate(&[broncos_chiefs(), unknown, unlisted])
        .unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].confidence, Confidence::High);
    assert_eq!(results[1].confidence, Confidence::None);
    assert_eq!(results[2].reason_code, Some(ReasonCode::NoCandidate));
}

// =============================================================================
// Failure Modes
// =============================================================================

#[test]
fn test_grammar_violations_are_ticker_parse_errors() {
    let decoder = TickerDecoder::new(Arc::new(TeamNormalizer::embedded().unwrap()));
    for ticker in ["garbage", "KXNFLGAME-25NOV16-KC", "KXNFLGAME-25NOV16KCDEN-", "🏈-25NOV16KCDEN-KC"] {
        let err = decoder.decode(ticker).unwrap_err();
        assert!(matches!(err, TickerParseError::Malformed { .. }), "{ticker}: {err}");
    }
}

#[tokio::test]
async fn test_missing_team_table_is_a_hard_error() {
    let nfl_only: TeamTableFile = TeamTableFile::from_toml_str(
        "test",
        r#"
sport = "NFL"
version = "test"
ticker_series = ["KXNFLGAME"]

[[teams]]
id = "KC"
display_name = "Kansas City Chiefs"

[[teams]]
id = "DEN"
display_name = "Denver Broncos"
"#,
    )
    .unwrap();
    let normalizer = Arc::new(TeamNormalizer::from_tables([nfl_only]).unwrap());
    let config = MatchingConfig::default();
    let cache = Arc::new(MarketSnapshotCache::new(
        InMemorySource::with_rows(Vec::new()),
        Arc::clone(&normalizer),
        &SnapshotConfig::default(),
        &config,
    ));
    let reconciler = Reconciler::new(normalizer, cache, &config);

    let mut game = broncos_chiefs();
    game.sport = Sport::Nhl;
    let err = reconciler.reconcile(&game).unwrap_err();
    assert_eq!(err, ReconcileError::MissingTeamTable { sport: Sport::Nhl });

    // The NFL game still reconciles (to nothing: the store is empty).
    let result = reconciler.reconcile(&broncos_chiefs()).unwrap();
    assert_eq!(result.reason_code, Some(ReasonCode::NoCandidate));
}
