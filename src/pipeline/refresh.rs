// src/pipeline/refresh.rs

//! Background refresh of tracked performers.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::storage::{EventCache, RefreshOutcome};

/// Summary of one sweep over the cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub total: usize,
    pub refreshed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Periodically re-crawls every tracked performer that is not already being
/// crawled. Never adds or removes keys.
pub struct RefreshWorker {
    cache: Arc<EventCache>,
    interval: Duration,
    concurrency: usize,
}

impl RefreshWorker {
    /// Worker ticking at the cache's expiry interval.
    pub fn new(cache: Arc<EventCache>, concurrency: usize) -> Self {
        let interval = cache.expiry();
        Self::with_interval(cache, interval, concurrency)
    }

    pub fn with_interval(cache: Arc<EventCache>, interval: Duration, concurrency: usize) -> Self {
        Self {
            cache,
            interval: interval.max(Duration::from_millis(1)),
            concurrency: concurrency.max(1),
        }
    }

    /// Refresh every tracked key once.
    ///
    /// One key's failure is logged and does not stop the others.
    pub async fn sweep(&self) -> SweepReport {
        let keys = self.cache.keys().await;
        let mut report = SweepReport {
            total: keys.len(),
            ..SweepReport::default()
        };

        let mut results = stream::iter(keys)
            .map(|key| async move {
                let result = self.cache.try_refresh(&key).await;
                (key, result)
            })
            .buffer_unordered(self.concurrency);

        while let Some((key, result)) = results.next().await {
            match result {
                Ok(RefreshOutcome::Refreshed(count)) => {
                    report.refreshed += 1;
                    log::debug!("Refreshed {key}: {count} events");
                }
                Ok(RefreshOutcome::Skipped) => report.skipped += 1,
                Err(error) => {
                    report.failed += 1;
                    log::warn!("Failed to refresh {key}: {error}");
                }
            }
        }

        report
    }

    /// Sweep forever, first one interval after start.
    pub async fn run(self) {
        log::info!(
            "Refresh worker started (interval {}s)",
            self.interval.as_secs()
        );
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let report = self.sweep().await;
            log::info!(
                "Refresh sweep: {} tracked, {} refreshed, {} skipped, {} failed",
                report.total,
                report.refreshed,
                report.skipped,
                report.failed
            );
        }
    }

    /// Run on the tokio runtime; abort the handle to stop.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
