//! The market snapshot cache.
//!
//! Readers take an `Arc` to the current snapshot and never wait on I/O. The
//! refresh path performs one batched fetch, builds the next snapshot off to
//! the side, and swaps the pointer. A failed refresh keeps the previous
//! snapshot visible and marks the cache stale.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use sports_recon_core::{MarketSource, MatchingConfig, SnapshotConfig};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::RefreshError;
use crate::snapshot::{DateBucketer, MarketSnapshot, SnapshotBuilder};
use crate::teams::TeamNormalizer;

/// The visible snapshot and whether the latest refresh after it failed.
/// Swapped together so staleness is always judged for the snapshot served.
#[derive(Debug, Clone)]
struct Served {
    snapshot: Arc<MarketSnapshot>,
    refresh_failed: bool,
}

pub struct MarketSnapshotCache {
    source: Arc<dyn MarketSource>,
    builder: SnapshotBuilder,
    config: SnapshotConfig,
    current: RwLock<Served>,
    /// Serializes refreshes; readers never touch it.
    refresh_lock: Mutex<()>,
}

impl MarketSnapshotCache {
    /// Creates a cache serving an empty, stale snapshot until the first refresh.
    #[must_use]
    pub fn new(
        source: Arc<dyn MarketSource>,
        normalizer: Arc<TeamNormalizer>,
        snapshot_config: &SnapshotConfig,
        matching_config: &MatchingConfig,
    ) -> Self {
        Self {
            source,
            builder: SnapshotBuilder::new(normalizer, matching_config),
            config: snapshot_config.clone(),
            current: RwLock::new(Served {
                snapshot: Arc::new(MarketSnapshot::empty()),
                refresh_failed: false,
            }),
            refresh_lock: Mutex::new(()),
        }
    }

    /// The snapshot visible right now.
    #[must_use]
    pub fn current(&self) -> Arc<MarketSnapshot> {
        Arc::clone(&self.current.read().snapshot)
    }

    /// The visible snapshot paired with its staleness as of `now`, both read
    /// under one lock so a concurrent swap cannot split them.
    #[must_use]
    pub fn snapshot_at(&self, now: DateTime<Utc>) -> (Arc<MarketSnapshot>, bool) {
        let served = self.current.read().clone();
        let stale = self.judge_stale(&served, now);
        (served.snapshot, stale)
    }

    #[must_use]
    pub fn bucketer(&self) -> &DateBucketer {
        self.builder.bucketer()
    }

    #[must_use]
    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// When the visible snapshot was fetched, or `None` before the first success.
    #[must_use]
    pub fn last_success(&self) -> Option<DateTime<Utc>> {
        let snapshot = self.current();
        (snapshot.generation() > 0).then(|| snapshot.fetched_at())
    }

    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.is_stale_at(Utc::now())
    }

    /// Stale if nothing was ever loaded, the last refresh failed, or the
    /// snapshot is older than `stale_after_intervals` refresh intervals.
    #[must_use]
    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        self.snapshot_at(now).1
    }

    fn judge_stale(&self, served: &Served, now: DateTime<Utc>) -> bool {
        let snapshot = &served.snapshot;
        if snapshot.generation() == 0 || served.refresh_failed {
            return true;
        }
        match now.signed_duration_since(snapshot.fetched_at()).to_std() {
            Ok(age) => age > self.config.stale_ceiling(),
            // Fetched "after" now: clock skew, not age.
            Err(_) => false,
        }
    }

    /// Fetches all active markets once and swaps in the new snapshot.
    ///
    /// # Errors
    /// Returns `RefreshError` if the fetch fails or times out, or too many
    /// sports rows fail ticker decoding. The previous snapshot stays visible.
    pub async fn refresh_once(&self) -> Result<Arc<MarketSnapshot>, RefreshError> {
        let _guard = self.refresh_lock.lock().await;
        let started = Instant::now();

        let fetch = tokio::time::timeout(
            self.config.fetch_timeout(),
            self.source.fetch_active_markets(),
        )
        .await;
        let rows = match fetch {
            Ok(Ok(rows)) => rows,
            Ok(Err(error)) => {
                return Err(self.fail(RefreshError::Fetch {
                    source_name: self.source.name().to_string(),
                    error,
                }))
            }
            Err(_) => {
                return Err(self.fail(RefreshError::Timeout {
                    timeout_secs: self.config.fetch_timeout_secs,
                }))
            }
        };

        let generation = self.current().generation() + 1;
        let snapshot = self.builder.build(rows, generation, Utc::now());
        let stats = *snapshot.stats();

        if stats.decode_error_fraction() > self.config.max_decode_error_fraction {
            return Err(self.fail(RefreshError::DecodeErrorRate {
                errors: stats.decode_errors,
                rows: stats.sports_rows(),
                max_fraction: self.config.max_decode_error_fraction,
            }));
        }

        let snapshot = Arc::new(snapshot);
        *self.current.write() = Served {
            snapshot: Arc::clone(&snapshot),
            refresh_failed: false,
        };

        info!(
            generation,
            source = self.source.name(),
            total_rows = stats.total_rows,
            active_rows = stats.active_rows,
            indexed_rows = stats.indexed_rows,
            skipped_non_sports = stats.skipped_non_sports,
            decode_errors = stats.decode_errors,
            title_conflicts = stats.title_conflicts,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Market snapshot refreshed"
        );
        Ok(snapshot)
    }

    fn fail(&self, error: RefreshError) -> RefreshError {
        let snapshot = {
            let mut served = self.current.write();
            served.refresh_failed = true;
            Arc::clone(&served.snapshot)
        };
        warn!(
            error = %error,
            serving_generation = snapshot.generation(),
            "Market snapshot refresh failed; serving previous snapshot as stale"
        );
        error
    }

    /// Runs `refresh_once` on the configured interval until `shutdown` flips
    /// to `true` or its sender is dropped. The first tick fires immediately.
    pub fn spawn_refresh_loop(self: &Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(cache.config.refresh_interval());
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(
                interval_secs = cache.config.refresh_interval_secs,
                source = cache.source.name(),
                "Market snapshot refresh loop started"
            );

            loop {
                tokio::select! {
                    _ = timer.tick() => {
                        if let Err(e) = cache.refresh_once().await {
                            debug!(error = %e, "Refresh tick failed");
                        }
                    }

                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            info!("Market snapshot refresh loop stopped");
                            return;
                        }
                    }
                }
            }
        })
    }
}

impl std::fmt::Debug for MarketSnapshotCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let served = self.current.read().clone();
        f.debug_struct("MarketSnapshotCache")
            .field("source", &self.source.name())
            .field("generation", &served.snapshot.generation())
            .field("markets", &served.snapshot.len())
            .field("refresh_failed", &served.refresh_failed)
            .finish()
    }
}
