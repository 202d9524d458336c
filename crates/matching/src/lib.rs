//! Reconciliation of scoreboard games with prediction-market contracts.
//!
//! A scoreboard feed and a market feed describe the same games with different
//! naming systems. This crate resolves both sides to canonical teams, finds
//! the contracts for each game, decides which team each contract pays out on,
//! and reports implied win probabilities with an explicit confidence level.
//!
//! # Pipeline
//!
//! ```text
//! Game ──► TeamNormalizer ──► MarketSnapshotCache lookup ──► TickerDecoder
//!                                                                │
//!          MatchResult ◄── MatchValidator ◄── MatchingEngine ◄───┘
//! ```
//!
//! # Modules
//!
//! - [`teams`]: data-driven, per-sport team tables and name normalization
//! - [`ticker`]: game-winner ticker decoding
//! - [`title`]: advisory market title parsing
//! - [`snapshot`]: immutable market snapshots and their index
//! - [`cache`]: the refreshed, atomically swapped snapshot cache
//! - [`matcher`]: candidate lookup and ranking for one game
//! - [`validator`]: price checks and confidence rules
//! - [`reconciler`]: the `reconcile(game)` entry point
//!
//! # Example
//!
//! ```ignore
//! use sports_recon_matching::{MarketSnapshotCache, Reconciler, TeamNormalizer};
//!
//! let normalizer = Arc::new(TeamNormalizer::load(&config.teams)?);
//! let cache = Arc::new(MarketSnapshotCache::new(
//!     source,
//!     Arc::clone(&normalizer),
//!     &config.snapshot,
//!     &config.matching,
//! ));
//! cache.refresh_once().await?;
//!
//! let reconciler = Reconciler::new(normalizer, cache, &config.matching);
//! let result = reconciler.reconcile(&game)?;
//! if result.is_reliable() {
//!     println!("{result}");
//! }
//! ```

pub mod cache;
pub mod error;
pub mod matcher;
pub mod reconciler;
pub mod snapshot;
pub mod teams;
pub mod ticker;
pub mod title;
pub mod types;
pub mod validator;

pub use cache::MarketSnapshotCache;
pub use error::{
    MatchError, NormalizationError, PriceValidationError, ReconcileError, RefreshError,
    TeamTableError, TickerParseError,
};
pub use matcher::MatchingEngine;
pub use reconciler::Reconciler;
pub use snapshot::{
    rank_order, DateBucketer, IndexKey, MarketEntry, MarketSnapshot, SnapshotBuilder,
    SnapshotStats,
};
pub use teams::{CanonicalTeam, TeamEntry, TeamNormalizer, TeamTableFile};
pub use ticker::TickerDecoder;
pub use title::parse_title;
pub use types::{
    Candidate, CandidateSet, Confidence, DisambiguationNote, MatchResult, NoteReason, ReasonCode,
    TickerInfo,
};
pub use validator::MatchValidator;
