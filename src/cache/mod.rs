//! Response cache shared by the coordinator and every worker
//!
//! Provides namespaced keys and a JSON snapshot store with atomic writes and
//! file locking.

pub mod key;
pub mod store;

pub use key::{CacheKey, CacheNamespace};
pub use store::{CacheError, CacheStats, CacheStore, DEFAULT_CACHE_PATH};
