// src/storage/cache.rs

//! In-memory event cache keyed by performer.
//!
//! Each entry owns an async mutex that is held for exactly the duration of a
//! crawl of that performer. Foreground readers wait on it, the background
//! worker skips entries whose mutex is taken, so a performer is never crawled
//! twice at the same time. The map lock itself is never held across a crawl.
//!
//! Crawls run on their own task together with the entry's lock guard. A
//! caller that goes away stops waiting, but the crawl still runs to
//! completion or failure and stores its result.
//!
//! Entries are never evicted: every performer ever requested stays tracked
//! for the lifetime of the process.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio::time::Instant;

use crate::error::{AppError, Result};
use crate::models::{ActorKey, CacheConfig, Event};
use crate::services::Crawler;

/// Result of a background refresh attempt for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Crawl finished and stored this many events
    Refreshed(usize),
    /// A crawl for the key was already running, or the key is unknown
    Skipped,
}

/// Diagnostic view of the cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheSnapshot {
    pub tracked_keys: usize,
    pub total_events: usize,
    pub crawling: usize,
    pub actors: Vec<String>,
}

#[derive(Default)]
struct EntryState {
    data: Arc<Vec<Event>>,
    last_crawl: Option<Instant>,
}

#[derive(Default)]
struct CacheEntry {
    state: RwLock<EntryState>,
    crawl_lock: Arc<Mutex<()>>,
}

impl CacheEntry {
    async fn fresh(&self, expiry: Duration) -> Option<Arc<Vec<Event>>> {
        let state = self.state.read().await;
        state
            .last_crawl
            .filter(|at| at.elapsed() < expiry)
            .map(|_| Arc::clone(&state.data))
    }

    async fn last_good(&self) -> Option<Arc<Vec<Event>>> {
        let state = self.state.read().await;
        state.last_crawl.map(|_| Arc::clone(&state.data))
    }

    fn is_locked(&self) -> bool {
        self.crawl_lock.try_lock().is_err()
    }
}

/// Performer-keyed store of the latest crawl results.
pub struct EventCache {
    crawler: Arc<Crawler>,
    expiry: Duration,
    serve_stale: bool,
    entries: RwLock<HashMap<ActorKey, Arc<CacheEntry>>>,
}

impl EventCache {
    pub fn new(crawler: Crawler, config: &CacheConfig) -> Self {
        Self {
            crawler: Arc::new(crawler),
            expiry: config.expiry(),
            serve_stale: config.serve_stale,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Maximum age of cached data; also the background refresh interval.
    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    pub fn crawler(&self) -> &Crawler {
        &self.crawler
    }

    /// Return fresh cached events, crawling first when missing or stale.
    ///
    /// Concurrent callers for the same stale key share one crawl: later
    /// callers wait for the entry lock and then reuse the fresh result. A
    /// failed crawl leaves the entry untouched and returns the error.
    pub async fn get_or_refresh(&self, key: &ActorKey) -> Result<Arc<Vec<Event>>> {
        let entry = self.entry(key).await;
        if let Some(data) = entry.fresh(self.expiry).await {
            return Ok(data);
        }

        let guard = Arc::clone(&entry.crawl_lock).lock_owned().await;
        if let Some(data) = entry.fresh(self.expiry).await {
            log::debug!("Reusing crawl finished while waiting for {key}");
            return Ok(data);
        }

        self.spawn_crawl(entry, key, guard).await
    }

    /// [`EventCache::get_or_refresh`] with the configured failure policy.
    ///
    /// When the crawl fails and an earlier crawl succeeded, the earlier data
    /// is served if `serve_stale` is on. Otherwise the performer is reported
    /// unavailable.
    pub async fn resolve(&self, key: &ActorKey) -> Result<Arc<Vec<Event>>> {
        let error = match self.get_or_refresh(key).await {
            Ok(data) => return Ok(data),
            Err(e) => e,
        };

        if self.serve_stale {
            if let Some(data) = self.cached(key).await {
                log::warn!("Serving stale events for {key}: {error}");
                return Ok(data);
            }
        }

        log::error!("Events unavailable for {key}: {error}");
        Err(AppError::unavailable(key.to_string(), error))
    }

    /// Re-crawl a tracked key unless a crawl for it is already running.
    pub async fn try_refresh(&self, key: &ActorKey) -> Result<RefreshOutcome> {
        let Some(entry) = self.entries.read().await.get(key).cloned() else {
            return Ok(RefreshOutcome::Skipped);
        };
        let Ok(guard) = Arc::clone(&entry.crawl_lock).try_lock_owned() else {
            log::debug!("Skipping {key}: crawl already in flight");
            return Ok(RefreshOutcome::Skipped);
        };

        let data = self.spawn_crawl(entry, key, guard).await?;
        Ok(RefreshOutcome::Refreshed(data.len()))
    }

    /// Data of the last successful crawl, regardless of age.
    pub async fn cached(&self, key: &ActorKey) -> Option<Arc<Vec<Event>>> {
        let entry = self.entries.read().await.get(key).cloned()?;
        entry.last_good().await
    }

    /// Whether a crawl for the key is in flight right now.
    pub async fn is_locked(&self, key: &ActorKey) -> bool {
        self.entries
            .read()
            .await
            .get(key)
            .is_some_and(|entry| entry.is_locked())
    }

    /// All tracked keys.
    pub async fn keys(&self) -> Vec<ActorKey> {
        let mut keys: Vec<ActorKey> = self.entries.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Counts for diagnostics. Never waits on or starts a crawl.
    pub async fn snapshot(&self) -> CacheSnapshot {
        let entries: Vec<(ActorKey, Arc<CacheEntry>)> = self
            .entries
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), Arc::clone(v)))
            .collect();

        let mut snapshot = CacheSnapshot {
            tracked_keys: entries.len(),
            ..CacheSnapshot::default()
        };
        for (key, entry) in entries {
            snapshot.total_events += entry.state.read().await.data.len();
            if entry.is_locked() {
                snapshot.crawling += 1;
            }
            snapshot.actors.push(key.name);
        }
        snapshot.actors.sort();
        snapshot
    }

    async fn entry(&self, key: &ActorKey) -> Arc<CacheEntry> {
        if let Some(entry) = self.entries.read().await.get(key) {
            return Arc::clone(entry);
        }
        let mut entries = self.entries.write().await;
        Arc::clone(entries.entry(key.clone()).or_default())
    }

    /// Crawl and store on a separate task that owns the crawl lock guard,
    /// then wait for its result.
    async fn spawn_crawl(
        &self,
        entry: Arc<CacheEntry>,
        key: &ActorKey,
        guard: OwnedMutexGuard<()>,
    ) -> Result<Arc<Vec<Event>>> {
        let crawler = Arc::clone(&self.crawler);
        let key = key.clone();

        let task = tokio::spawn(async move {
            let _guard = guard;
            let events = Arc::new(crawler.crawl(&key).await?);

            let mut state = entry.state.write().await;
            state.data = Arc::clone(&events);
            state.last_crawl = Some(Instant::now());
            Ok::<_, AppError>(events)
        });
        task.await?
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::sync::Semaphore;

    use super::*;
    use crate::models::CrawlerConfig;
    use crate::services::PageFetcher;
    use crate::services::crawler_tests::listing;
    use crate::services::event_tests::{entry_html, page_html};

    /// Fetcher whose pages, failure mode and pacing can be changed mid-test.
    #[derive(Default)]
    pub(crate) struct ScriptedFetcher {
        pages: StdMutex<Vec<String>>,
        fail: AtomicBool,
        fetches: AtomicUsize,
        gate: Option<Semaphore>,
    }

    impl ScriptedFetcher {
        pub(crate) fn with_page_sizes(sizes: &[usize]) -> Self {
            let fetcher = Self::default();
            fetcher.set_page_sizes(sizes);
            fetcher
        }

        /// Every fetch waits for a permit from [`ScriptedFetcher::open_gate`].
        pub(crate) fn gated(sizes: &[usize]) -> Self {
            Self {
                gate: Some(Semaphore::new(0)),
                ..Self::with_page_sizes(sizes)
            }
        }

        pub(crate) fn open_gate(&self) {
            if let Some(gate) = &self.gate {
                gate.add_permits(1_000);
            }
        }

        pub(crate) fn set_page_sizes(&self, sizes: &[usize]) {
            *self.pages.lock().unwrap() = sizes
                .iter()
                .enumerate()
                .map(|(i, &count)| listing(i + 1, count))
                .collect();
        }

        pub(crate) fn set_failing(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }

        pub(crate) fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PageFetcher for ScriptedFetcher {
        async fn fetch(&self, url: &str) -> Result<String> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(AppError::Fetch {
                    url: url.to_string(),
                    status: 503,
                });
            }

            let page: usize = url::Url::parse(url)
                .unwrap()
                .query_pairs()
                .find(|(k, _)| k == "page")
                .and_then(|(_, v)| v.parse().ok())
                .unwrap();
            let pages = self.pages.lock().unwrap();
            Ok(pages
                .get(page - 1)
                .cloned()
                .unwrap_or_else(|| listing(page, 0)))
        }
    }

    pub(crate) fn cache_with(fetcher: Arc<ScriptedFetcher>, expire_secs: u64, serve_stale: bool) -> EventCache {
        let crawler = Crawler::new(&CrawlerConfig::default(), fetcher).unwrap();
        EventCache::new(
            crawler,
            &CacheConfig {
                expire_secs,
                serve_stale,
            },
        )
    }

    fn key() -> ActorKey {
        ActorKey::new("someone", 2634)
    }

    #[tokio::test]
    async fn test_first_access_crawls_then_serves_from_cache() {
        let fetcher = Arc::new(ScriptedFetcher::with_page_sizes(&[3]));
        let cache = cache_with(fetcher.clone(), 3600, true);

        let first = cache.get_or_refresh(&key()).await.unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(fetcher.fetches(), 2);

        let second = cache.get_or_refresh(&key()).await.unwrap();
        assert_eq!(second.len(), 3);
        assert_eq!(fetcher.fetches(), 2);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_expired_entry_is_recrawled() {
        let fetcher = Arc::new(ScriptedFetcher::with_page_sizes(&[3]));
        let cache = cache_with(fetcher.clone(), 0, true);

        cache.get_or_refresh(&key()).await.unwrap();
        fetcher.set_page_sizes(&[1]);
        let data = cache.get_or_refresh(&key()).await.unwrap();

        assert_eq!(data.len(), 1);
        assert_eq!(fetcher.fetches(), 4);
    }

    #[tokio::test]
    async fn test_failed_recrawl_keeps_previous_data() {
        let fetcher = Arc::new(ScriptedFetcher::with_page_sizes(&[2]));
        let cache = cache_with(fetcher.clone(), 0, true);
        cache.get_or_refresh(&key()).await.unwrap();

        fetcher.set_failing(true);
        assert!(cache.get_or_refresh(&key()).await.is_err());
        assert_eq!(cache.cached(&key()).await.unwrap().len(), 2);
        assert!(!cache.is_locked(&key()).await);
    }

    #[tokio::test]
    async fn test_hard_fault_leaves_entry_untouched() {
        let fetcher = Arc::new(ScriptedFetcher::with_page_sizes(&[2]));
        let cache = cache_with(fetcher.clone(), 0, false);
        let before = cache.get_or_refresh(&key()).await.unwrap();

        let broken = page_html(&[entry_html("9", "X", None, None, None)]);
        *fetcher.pages.lock().unwrap() = vec![broken];

        let err = cache.get_or_refresh(&key()).await.unwrap_err();
        assert!(matches!(err, AppError::Parsing(_)));
        let after = cache.cached(&key()).await.unwrap();
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[tokio::test]
    async fn test_resolve_serves_stale_on_failure() {
        let fetcher = Arc::new(ScriptedFetcher::with_page_sizes(&[2]));
        let cache = cache_with(fetcher.clone(), 0, true);
        cache.resolve(&key()).await.unwrap();

        fetcher.set_failing(true);
        assert_eq!(cache.resolve(&key()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_resolve_strict_policy_reports_unavailable() {
        let fetcher = Arc::new(ScriptedFetcher::with_page_sizes(&[2]));
        let cache = cache_with(fetcher.clone(), 0, false);
        cache.resolve(&key()).await.unwrap();

        fetcher.set_failing(true);
        let err = cache.resolve(&key()).await.unwrap_err();
        assert!(matches!(err, AppError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_resolve_without_prior_data_is_unavailable() {
        let fetcher = Arc::new(ScriptedFetcher::with_page_sizes(&[2]));
        fetcher.set_failing(true);
        let cache = cache_with(fetcher, 3600, true);

        let err = cache.resolve(&key()).await.unwrap_err();
        assert!(matches!(err, AppError::Unavailable { .. }));

        // the key is tracked even though its first crawl failed
        assert_eq!(cache.keys().await, vec![key()]);
        assert!(cache.cached(&key()).await.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_readers_share_one_crawl() {
        let fetcher = Arc::new(ScriptedFetcher::gated(&[4]));
        let cache = Arc::new(cache_with(fetcher.clone(), 3600, true));

        let readers: Vec<_> = (0..5)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.get_or_refresh(&key()).await })
            })
            .collect();

        while !cache.is_locked(&key()).await {
            tokio::task::yield_now().await;
        }
        fetcher.open_gate();

        for reader in readers {
            assert_eq!(reader.await.unwrap().unwrap().len(), 4);
        }
        assert_eq!(fetcher.fetches(), 2);
        assert!(!cache.is_locked(&key()).await);
    }

    #[tokio::test]
    async fn test_crawl_outlives_abandoned_reader() {
        let fetcher = Arc::new(ScriptedFetcher::gated(&[3]));
        let cache = Arc::new(cache_with(fetcher.clone(), 3600, true));

        let reader = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.get_or_refresh(&key()).await })
        };
        // the crawl task has reached the fetcher
        while fetcher.fetches() == 0 {
            tokio::task::yield_now().await;
        }
        reader.abort();
        assert!(reader.await.unwrap_err().is_cancelled());

        // still locked: the crawl kept running without its caller
        assert!(cache.is_locked(&key()).await);
        fetcher.open_gate();

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while cache.cached(&key()).await.is_none() {
            assert!(std::time::Instant::now() < deadline, "crawl never stored its result");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        while cache.is_locked(&key()).await {
            tokio::task::yield_now().await;
        }

        assert_eq!(cache.cached(&key()).await.unwrap().len(), 3);
        assert_eq!(cache.get_or_refresh(&key()).await.unwrap().len(), 3);
        assert_eq!(fetcher.fetches(), 2);
    }

    #[tokio::test]
    async fn test_try_refresh_skips_locked_entry() {
        let fetcher = Arc::new(ScriptedFetcher::gated(&[1]));
        let cache = Arc::new(cache_with(fetcher.clone(), 3600, true));

        let reader = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.get_or_refresh(&key()).await })
        };
        while !cache.is_locked(&key()).await {
            tokio::task::yield_now().await;
        }

        assert_eq!(cache.try_refresh(&key()).await.unwrap(), RefreshOutcome::Skipped);
        assert_eq!(cache.snapshot().await.crawling, 1);

        fetcher.open_gate();
        reader.await.unwrap().unwrap();
        assert!(!cache.is_locked(&key()).await);
        assert_eq!(
            cache.try_refresh(&key()).await.unwrap(),
            RefreshOutcome::Refreshed(1)
        );
    }

    #[tokio::test]
    async fn test_try_refresh_ignores_unknown_key() {
        let fetcher = Arc::new(ScriptedFetcher::with_page_sizes(&[1]));
        let cache = cache_with(fetcher.clone(), 3600, true);

        assert_eq!(cache.try_refresh(&key()).await.unwrap(), RefreshOutcome::Skipped);
        assert!(cache.keys().await.is_empty());
        assert_eq!(fetcher.fetches(), 0);
    }

    #[tokio::test]
    async fn test_snapshot_counts() {
        let fetcher = Arc::new(ScriptedFetcher::with_page_sizes(&[2]));
        let cache = cache_with(fetcher, 3600, true);

        cache.get_or_refresh(&ActorKey::new("b", 2)).await.unwrap();
        cache.get_or_refresh(&ActorKey::new("a", 1)).await.unwrap();

        let snapshot = cache.snapshot().await;
        assert_eq!(snapshot.tracked_keys, 2);
        assert_eq!(snapshot.total_events, 4);
        assert_eq!(snapshot.crawling, 0);
        assert_eq!(snapshot.actors, vec!["a", "b"]);
    }
}
