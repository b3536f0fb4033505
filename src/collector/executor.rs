//! Hierarchy walk and stopping rule
//!
//! The coordinator walks brands → models → years on its own fetcher and hands
//! every leaf to the [`WorkerPool`]. At most `pool_size * backlog_factor`
//! leaves are outstanding; at the ceiling it blocks on the first completion
//! and then absorbs whatever else already finished. The record limit is
//! checked after every appended record. Once it is reached submission stops,
//! queued leaves are dropped and the run waits only for lookups already in
//! progress before the single cache flush.

use super::catalog::Catalog;
use super::config::{CollectorConfig, PROGRESS_LOG_INTERVAL};
use super::pool::{LeafOutcome, WorkerPool};
use super::CollectError;
use crate::cache::CacheStore;
use crate::fetcher::{FetcherFactory, JsonFetcher};
use crate::shutdown::{self, SharedShutdown};
use crate::{CollectedRecord, Leaf};
use indicatif::ProgressBar;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Why a collection run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Every leaf was visited and every task completed
    #[default]
    Exhausted,
    /// The record limit was reached
    LimitReached,
    /// Shutdown was requested (Ctrl+C)
    Interrupted,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            StopReason::Exhausted => "catalog exhausted",
            StopReason::LimitReached => "limit reached",
            StopReason::Interrupted => "interrupted",
        };
        f.write_str(label)
    }
}

/// Counters for one collection run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectStats {
    /// Brands listed
    pub brands: usize,
    /// Models listed across visited brands
    pub models: usize,
    /// Leaves handed to the pool
    pub leaves_submitted: usize,
    /// Records collected
    pub records: usize,
    /// Leaves whose detail payload was empty
    pub leaves_empty: usize,
    /// Leaves whose detail lookup failed
    pub leaves_failed: usize,
    /// Brand, model or year lookups that failed and were treated as empty
    pub lookups_failed: usize,
    /// Highest number of outstanding tasks observed
    pub peak_outstanding: usize,
    /// Why the run stopped
    pub stop_reason: StopReason,
}

/// Records plus run counters
#[derive(Debug, Clone, Default)]
pub struct CollectOutcome {
    /// Collected records, in completion order, never more than the limit
    pub records: Vec<CollectedRecord>,
    /// Run counters
    pub stats: CollectStats,
}

enum Drain {
    Continue,
    LimitReached,
    Interrupted,
    PoolClosed,
}

/// Mutable state of a single run
struct Run<'a> {
    limit: usize,
    outstanding: usize,
    records: Vec<CollectedRecord>,
    stats: CollectStats,
    progress: Option<&'a ProgressBar>,
}

impl Run<'_> {
    fn submitted(&mut self) {
        self.outstanding += 1;
        self.stats.leaves_submitted += 1;
        self.stats.peak_outstanding = self.stats.peak_outstanding.max(self.outstanding);
    }

    /// Account for one completed task. Returns `true` when the limit is hit.
    fn absorb(&mut self, outcome: LeafOutcome) -> bool {
        self.outstanding = self.outstanding.saturating_sub(1);
        match outcome {
            LeafOutcome::Record(record) => {
                self.records.push(record);
                self.stats.records = self.records.len();
                if let Some(bar) = self.progress {
                    bar.set_position(self.records.len() as u64);
                }
                if self.records.len() % PROGRESS_LOG_INTERVAL == 0 {
                    info!(
                        collected = self.records.len(),
                        limit = self.limit,
                        "Collection progress"
                    );
                }
                self.records.len() >= self.limit
            }
            LeafOutcome::Empty(leaf) => {
                self.stats.leaves_empty += 1;
                debug!(%leaf, "Empty detail payload");
                false
            }
            LeafOutcome::Failed { leaf, error } => {
                self.stats.leaves_failed += 1;
                warn!(%leaf, error = %error, "Detail lookup failed");
                false
            }
        }
    }
}

/// Collects up to a global number of records from the brand → model → year
/// hierarchy using a bounded worker pool
pub struct HierarchicalCollector {
    config: CollectorConfig,
    factory: Arc<dyn FetcherFactory>,
    cache: Arc<CacheStore>,
    shutdown: Option<SharedShutdown>,
    progress: Option<ProgressBar>,
}

impl HierarchicalCollector {
    /// Create a collector. Picks up the global shutdown handle if one was
    /// registered.
    pub fn new(config: CollectorConfig, factory: Arc<dyn FetcherFactory>, cache: Arc<CacheStore>) -> Self {
        Self {
            config,
            factory,
            cache,
            shutdown: shutdown::get_global_shutdown(),
            progress: None,
        }
    }

    /// Use an explicit shutdown handle
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Report collected-record progress on `bar`
    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.progress = Some(bar);
        self
    }

    /// Pool sizing in effect
    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Shared response cache
    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .map(|s| s.is_shutdown_requested())
            .unwrap_or(false)
    }

    /// Collect at most `limit` records.
    ///
    /// Failed brand, model or year lookups are logged and treated as empty.
    /// Failed or empty detail lookups produce no record. The cache is flushed
    /// before returning however the run ended. Only failing to build the
    /// coordinator's own fetcher is an error.
    pub async fn collect(&self, limit: usize) -> Result<CollectOutcome, CollectError> {
        let mut run = Run {
            limit,
            outstanding: 0,
            records: Vec::with_capacity(limit.min(1024)),
            stats: CollectStats::default(),
            progress: self.progress.as_ref(),
        };

        if limit == 0 {
            info!("Record limit is zero, nothing to collect");
            run.stats.stop_reason = StopReason::LimitReached;
            self.flush_cache();
            return Ok(CollectOutcome {
                records: run.records,
                stats: run.stats,
            });
        }

        let fetcher = self.factory.create().map_err(CollectError::Client)?;
        let max_outstanding = self.config.max_outstanding();
        let mut pool = WorkerPool::spawn(
            self.config.workers(),
            max_outstanding,
            self.factory.clone(),
            self.cache.clone(),
        );

        info!(
            limit,
            workers = self.config.workers(),
            max_outstanding,
            "Starting catalog collection"
        );

        let stop = self
            .walk(fetcher.as_ref(), &mut pool, &mut run, max_outstanding)
            .await;

        if stop != StopReason::Exhausted {
            debug!(
                outstanding = run.outstanding,
                "Discarding outstanding lookups"
            );
        }
        pool.close().await;
        run.stats.stop_reason = stop;

        self.flush_cache();

        info!(
            records = run.records.len(),
            submitted = run.stats.leaves_submitted,
            failed = run.stats.leaves_failed,
            empty = run.stats.leaves_empty,
            peak_outstanding = run.stats.peak_outstanding,
            stop_reason = %stop,
            "Catalog collection finished"
        );

        Ok(CollectOutcome {
            records: run.records,
            stats: run.stats,
        })
    }

    async fn walk(
        &self,
        fetcher: &dyn JsonFetcher,
        pool: &mut WorkerPool,
        run: &mut Run<'_>,
        max_outstanding: usize,
    ) -> StopReason {
        let catalog = Catalog::new(fetcher, &self.cache);

        let brands = catalog.brands().await.unwrap_or_else(|e| {
            warn!(error = %e, "Brand lookup failed");
            run.stats.lookups_failed += 1;
            Vec::new()
        });
        run.stats.brands = brands.len();
        info!(brands = brands.len(), "Brands listed");

        for brand in &brands {
            if self.shutdown_requested() {
                return StopReason::Interrupted;
            }
            info!(brand = %brand.name, code = %brand.code, "Processing brand");

            let models = catalog.models(&brand.code).await.unwrap_or_else(|e| {
                warn!(brand = %brand.code, error = %e, "Model lookup failed");
                run.stats.lookups_failed += 1;
                Vec::new()
            });
            run.stats.models += models.len();

            for model in &models {
                let years = catalog
                    .years(&brand.code, &model.code)
                    .await
                    .unwrap_or_else(|e| {
                        warn!(
                            brand = %brand.code,
                            model = %model.code,
                            error = %e,
                            "Year lookup failed"
                        );
                        run.stats.lookups_failed += 1;
                        Vec::new()
                    });

                for year in years {
                    if self.shutdown_requested() {
                        return StopReason::Interrupted;
                    }

                    let leaf = Leaf {
                        brand_code: brand.code.clone(),
                        brand_name: brand.name.clone(),
                        model_code: model.code.clone(),
                        model_name: model.name.clone(),
                        year_code: year.code,
                    };
                    if !pool.submit(leaf).await {
                        warn!("Worker pool closed unexpectedly");
                        return StopReason::Exhausted;
                    }
                    run.submitted();

                    if run.outstanding >= max_outstanding {
                        match self.drain(pool, run).await {
                            Drain::Continue => {}
                            Drain::LimitReached => return StopReason::LimitReached,
                            Drain::Interrupted => return StopReason::Interrupted,
                            Drain::PoolClosed => return StopReason::Exhausted,
                        }
                    }
                }
            }
        }

        while run.outstanding > 0 {
            match self.drain(pool, run).await {
                Drain::Continue => {}
                Drain::LimitReached => return StopReason::LimitReached,
                Drain::Interrupted => return StopReason::Interrupted,
                Drain::PoolClosed => break,
            }
        }
        StopReason::Exhausted
    }

    /// Block on the first completion, then absorb every other finished task
    async fn drain(&self, pool: &mut WorkerPool, run: &mut Run<'_>) -> Drain {
        let first = match &self.shutdown {
            Some(shutdown) => tokio::select! {
                outcome = pool.next_completed() => outcome,
                _ = shutdown.wait_for_shutdown() => return Drain::Interrupted,
            },
            None => pool.next_completed().await,
        };
        let Some(first) = first else {
            return Drain::PoolClosed;
        };

        let mut next = Some(first);
        while let Some(outcome) = next {
            if run.absorb(outcome) {
                return Drain::LimitReached;
            }
            next = pool.try_next_completed();
        }
        Drain::Continue
    }

    fn flush_cache(&self) {
        if let Err(e) = self.cache.flush() {
            warn!(path = %self.cache.path().display(), error = %e, "Failed to flush cache");
        }
    }
}
