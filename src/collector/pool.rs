//! Fixed-size detail worker pool
//!
//! `size` long-lived tasks pull leaves from one bounded job channel and push a
//! [`LeafOutcome`] per leaf onto a result channel. Each worker builds its own
//! fetcher from the factory on its first job and keeps it until it exits.
//! Workers exit when the job channel closes or the result receiver is gone.

use super::catalog::Catalog;
use crate::cache::CacheStore;
use crate::fetcher::{FetchError, FetcherFactory, JsonFetcher};
use crate::normalize::normalize;
use crate::{CollectedRecord, Leaf};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::debug;

/// Result of one detail task
#[derive(Debug)]
pub enum LeafOutcome {
    /// Payload normalized into a record
    Record(CollectedRecord),
    /// Payload was empty; nothing to collect
    Empty(Leaf),
    /// Lookup failed after retries
    Failed {
        /// Leaf whose lookup failed
        leaf: Leaf,
        /// Final error
        error: FetchError,
    },
}

pub(crate) struct WorkerPool {
    jobs: mpsc::Sender<Leaf>,
    results: mpsc::Receiver<LeafOutcome>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `size` workers. `capacity` bounds both channels and must be at
    /// least the coordinator's outstanding-task ceiling.
    pub(crate) fn spawn(
        size: usize,
        capacity: usize,
        factory: Arc<dyn FetcherFactory>,
        cache: Arc<CacheStore>,
    ) -> Self {
        let (job_tx, job_rx) = mpsc::channel::<Leaf>(capacity.max(1));
        let (result_tx, result_rx) = mpsc::channel::<LeafOutcome>(capacity.max(1));
        let job_rx = Arc::new(Mutex::new(job_rx));

        let workers = (0..size.max(1))
            .map(|id| {
                tokio::spawn(run_worker(
                    id,
                    factory.clone(),
                    cache.clone(),
                    job_rx.clone(),
                    result_tx.clone(),
                ))
            })
            .collect();

        Self {
            jobs: job_tx,
            results: result_rx,
            workers,
        }
    }

    /// Queue a leaf. Returns `false` if every worker has exited.
    pub(crate) async fn submit(&self, leaf: Leaf) -> bool {
        self.jobs.send(leaf).await.is_ok()
    }

    /// Wait for the next completed task. `None` once all workers are gone.
    pub(crate) async fn next_completed(&mut self) -> Option<LeafOutcome> {
        self.results.recv().await
    }

    /// A completed task, if one is ready right now
    pub(crate) fn try_next_completed(&mut self) -> Option<LeafOutcome> {
        self.results.try_recv().ok()
    }

    /// Close both channels and wait for every worker to exit.
    ///
    /// A worker finishes the lookup it is on, fails to deliver the outcome
    /// and skips whatever is still queued. Once this returns nothing else
    /// writes to the cache.
    pub(crate) async fn close(self) {
        let Self {
            jobs,
            results,
            workers,
        } = self;
        drop(results);
        drop(jobs);
        for handle in workers {
            if let Err(e) = handle.await {
                debug!(error = %e, "worker task ended abnormally");
            }
        }
    }
}

async fn run_worker(
    id: usize,
    factory: Arc<dyn FetcherFactory>,
    cache: Arc<CacheStore>,
    jobs: Arc<Mutex<mpsc::Receiver<Leaf>>>,
    results: mpsc::Sender<LeafOutcome>,
) {
    let mut fetcher: Option<Box<dyn JsonFetcher>> = None;

    loop {
        let next = { jobs.lock().await.recv().await };
        let Some(leaf) = next else {
            break;
        };
        // Closed pool: skip whatever is still queued
        if results.is_closed() {
            break;
        }

        if fetcher.is_none() {
            match factory.create() {
                Ok(created) => {
                    debug!(worker = id, "worker fetcher created");
                    fetcher = Some(created);
                }
                Err(error) => {
                    if results.send(LeafOutcome::Failed { leaf, error }).await.is_err() {
                        break;
                    }
                    continue;
                }
            }
        }
        let Some(client) = fetcher.as_deref() else {
            continue;
        };

        let outcome = fetch_leaf(client, &cache, leaf).await;
        if results.send(outcome).await.is_err() {
            break;
        }
    }

    debug!(worker = id, "worker exiting");
}

/// Fetch and normalize one leaf
pub(crate) async fn fetch_leaf(fetcher: &dyn JsonFetcher, cache: &CacheStore, leaf: Leaf) -> LeafOutcome {
    let catalog = Catalog::new(fetcher, cache);
    match catalog
        .detail(&leaf.brand_code, &leaf.model_code, &leaf.year_code)
        .await
    {
        Ok(payload) => match normalize(&payload, &leaf.brand_name, &leaf.model_name) {
            Some(record) => LeafOutcome::Record(record),
            None => LeafOutcome::Empty(leaf),
        },
        Err(error) => LeafOutcome::Failed { leaf, error },
    }
}
