//! Reconciliation entry point.
//!
//! `Reconciler` wires the normalizer, the snapshot cache, the matching engine
//! and the validator together. Every call reads whichever snapshot is current
//! when it starts and never waits on a refresh.

use chrono::{DateTime, Utc};
use sports_recon_core::{Game, MatchingConfig};
use std::sync::Arc;
use tracing::{info, warn};

use crate::cache::MarketSnapshotCache;
use crate::error::{MatchError, ReconcileError};
use crate::matcher::MatchingEngine;
use crate::snapshot::MarketSnapshot;
use crate::teams::TeamNormalizer;
use crate::types::{MatchResult, ReasonCode};
use crate::validator::MatchValidator;

pub struct Reconciler {
    cache: Arc<MarketSnapshotCache>,
    engine: MatchingEngine,
    validator: MatchValidator,
}

impl Reconciler {
    #[must_use]
    pub fn new(
        normalizer: Arc<TeamNormalizer>,
        cache: Arc<MarketSnapshotCache>,
        config: &MatchingConfig,
    ) -> Self {
        Self {
            engine: MatchingEngine::new(normalizer, config),
            validator: MatchValidator::new(config),
            cache,
        }
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<MarketSnapshotCache> {
        &self.cache
    }

    /// Reconciles one game against the current snapshot.
    ///
    /// # Errors
    /// Returns `ReconcileError` only for configuration problems; every data
    /// problem is reported through the result's confidence and reason code.
    pub fn reconcile(&self, game: &Game) -> Result<MatchResult, ReconcileError> {
        self.reconcile_at(game, Utc::now())
    }

    /// Like `reconcile`, judging staleness as of `now`.
    ///
    /// # Errors
    /// See [`Reconciler::reconcile`].
    pub fn reconcile_at(&self, game: &Game, now: DateTime<Utc>) -> Result<MatchResult, ReconcileError> {
        let (snapshot, stale) = self.cache.snapshot_at(now);
        self.reconcile_against(game, &snapshot, stale)
    }

    /// Reconciles a whole slate against one snapshot.
    ///
    /// # Errors
    /// Fails on the first configuration error.
    pub fn reconcile_slate(&self, games: &[Game]) -> Result<Vec<MatchResult>, ReconcileError> {
        let (snapshot, stale) = self.cache.snapshot_at(Utc::now());
        games
            .iter()
            .map(|game| self.reconcile_against(game, &snapshot, stale))
            .collect()
    }

    /// Reconciles against an explicit snapshot.
    ///
    /// # Errors
    /// See [`Reconciler::reconcile`].
    pub fn reconcile_against(
        &self,
        game: &Game,
        snapshot: &MarketSnapshot,
        snapshot_stale: bool,
    ) -> Result<MatchResult, ReconcileError> {
        let result = match self.engine.find_candidates(game, snapshot, snapshot_stale) {
            Ok(set) => self.validator.validate(game, &set),
            Err(MatchError::Normalization(e)) => {
                warn!(
                    event_id = %game.event_id,
                    sport = %e.sport,
                    raw_name = %e.raw_name,
                    "Unknown team name; not guessing"
                );
                MatchResult::no_match(&game.event_id, ReasonCode::NoCandidate).with_note(e.to_string())
            }
            Err(MatchError::MissingTeamTable { sport }) => {
                return Err(ReconcileError::MissingTeamTable { sport });
            }
        };

        info!(
            event_id = %result.event_id,
            confidence = %result.confidence,
            ticker = result.matched_ticker.as_deref().unwrap_or("-"),
            reason = result.reason_code.map_or("-", |r| r.as_str()),
            generation = snapshot.generation(),
            "Reconciled game"
        );
        Ok(result)
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
