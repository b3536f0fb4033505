//! Collection configuration constants

/// Worker tasks fetching details in parallel.
/// 10 keeps the public API responsive without tripping its throttling.
pub const DEFAULT_POOL_SIZE: usize = 10;

/// Outstanding tasks allowed per worker before the coordinator blocks.
pub const DEFAULT_BACKLOG_FACTOR: usize = 4;

/// Records collected per run when no limit is given.
pub const DEFAULT_RECORD_LIMIT: usize = 370;

/// Log a progress line every N collected records.
pub const PROGRESS_LOG_INTERVAL: usize = 10;

/// Worker pool sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectorConfig {
    /// Number of workers, each owning one fetcher
    pub pool_size: usize,
    /// Outstanding-task ceiling is `pool_size * backlog_factor`
    pub backlog_factor: usize,
}

impl CollectorConfig {
    /// Config with the given pool size and the default backlog factor
    pub fn with_pool_size(pool_size: usize) -> Self {
        Self {
            pool_size,
            ..Self::default()
        }
    }

    /// Override the backlog factor
    pub fn backlog_factor(mut self, backlog_factor: usize) -> Self {
        self.backlog_factor = backlog_factor;
        self
    }

    /// Effective worker count (at least one)
    pub fn workers(&self) -> usize {
        self.pool_size.max(1)
    }

    /// Maximum number of submitted-but-not-completed tasks
    pub fn max_outstanding(&self) -> usize {
        self.workers() * self.backlog_factor.max(1)
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            backlog_factor: DEFAULT_BACKLOG_FACTOR,
        }
    }
}
