//! Event storage.
//!
//! Crawl results live only in memory: the cache is rebuilt on demand after a
//! restart.

pub mod cache;

// Re-export for convenience
pub use cache::{CacheSnapshot, EventCache, RefreshOutcome};
