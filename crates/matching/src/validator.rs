//! Turns a ranked candidate set into a `MatchResult`.

use rust_decimal::Decimal;
use sports_recon_core::{Game, MatchingConfig, RawMarket};
use tracing::debug;

use crate::error::PriceValidationError;
use crate::types::{Candidate, CandidateSet, Confidence, MatchResult, ReasonCode};

/// Applies the price, ambiguity and staleness rules to candidates.
#[derive(Debug, Clone)]
pub struct MatchValidator {
    price_sum_min: Decimal,
    price_sum_max: Decimal,
    ambiguous_volume_pct: Decimal,
    low_confidence_disagreements: usize,
}

impl MatchValidator {
    #[must_use]
    pub fn new(config: &MatchingConfig) -> Self {
        Self {
            price_sum_min: config.price_sum_min,
            price_sum_max: config.price_sum_max,
            ambiguous_volume_pct: config.ambiguous_volume_pct,
            low_confidence_disagreements: config.low_confidence_disagreements.max(1),
        }
    }

    /// Checks that YES and NO prices sum to roughly 1.0 (inclusive bounds).
    ///
    /// # Errors
    /// Returns `PriceValidationError` if the sum falls outside the bounds.
    pub fn check_prices(&self, market: &RawMarket) -> Result<(), PriceValidationError> {
        let sum = market.price_sum();
        if sum < self.price_sum_min || sum > self.price_sum_max {
            return Err(PriceValidationError {
                ticker: market.ticker.clone(),
                sum,
                min: self.price_sum_min,
                max: self.price_sum_max,
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn validate(&self, game: &Game, set: &CandidateSet<'_>) -> MatchResult {
        let mut notes: Vec<String> = set.discarded.iter().map(ToString::to_string).collect();

        if set.is_empty() {
            let mut result = MatchResult::no_match(&game.event_id, ReasonCode::NoCandidate);
            result.notes = notes;
            return result;
        }

        let mut survivors: Vec<&Candidate<'_>> = Vec::with_capacity(set.candidates.len());
        for candidate in &set.candidates {
            match self.check_prices(candidate.market) {
                Ok(()) => survivors.push(candidate),
                Err(e) => {
                    debug!(event_id = %game.event_id, error = %e, "Rejected candidate on prices");
                    notes.push(e.to_string());
                }
            }
        }

        let Some(top) = survivors.first() else {
            let mut result = MatchResult::no_match(&game.event_id, ReasonCode::PriceInconsistent);
            result.notes = notes;
            return result;
        };

        let (confidence, reason_code) = if set.disagreements() >= self.low_confidence_disagreements {
            (Confidence::Low, Some(ReasonCode::DisambiguationRequired))
        } else if set.snapshot_stale || self.is_ambiguous(&survivors) {
            (Confidence::Medium, Some(ReasonCode::AmbiguousOrStale))
        } else {
            (Confidence::High, None)
        };

        let market = top.market;
        let yes_team = top.ticker.yes_team.clone();
        let (home_implied_prob, away_implied_prob) = if confidence >= Confidence::Medium {
            if yes_team == set.home_team {
                (Some(market.yes_price), Some(market.no_price))
            } else {
                (Some(market.no_price), Some(market.yes_price))
            }
        } else {
            (None, None)
        };

        if set.snapshot_stale {
            notes.push("market snapshot is stale".to_string());
        }

        MatchResult {
            event_id: game.event_id.clone(),
            matched_ticker: Some(market.ticker.clone()),
            yes_canonical_team: Some(yes_team),
            home_implied_prob,
            away_implied_prob,
            confidence,
            reason_code,
            notes,
        }
    }

    /// Top two survivors within `ambiguous_volume_pct` of the leader's volume.
    fn is_ambiguous(&self, survivors: &[&Candidate<'_>]) -> bool {
        let [first, second, ..] = survivors else {
            return false;
        };
        let top = Decimal::from(first.market.volume);
        let gap = top - Decimal::from(second.market.volume);
        gap <= top * self.ambiguous_volume_pct
    }
}
