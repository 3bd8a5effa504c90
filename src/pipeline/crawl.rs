// src/pipeline/crawl.rs

//! One-shot crawl of a single performer.

use std::sync::Arc;

use chrono::Utc;

use crate::error::Result;
use crate::feeds::{FeedFormat, render_ical, render_json, render_rss};
use crate::models::{ActorKey, Config};
use crate::services::{Crawler, HttpFetcher};

/// Crawl a performer without the cache and render the result.
pub async fn run_crawl(config: &Config, key: &ActorKey, format: FeedFormat) -> Result<String> {
    let start_time = Utc::now();
    let fetcher = Arc::new(HttpFetcher::new(&config.crawler)?);
    let crawler = Crawler::new(&config.crawler, fetcher)?;

    let events = crawler.crawl(key).await?;
    log::info!(
        "Crawled {} events for {key} in {}s",
        events.len(),
        (Utc::now() - start_time).num_seconds()
    );

    let base_url = crawler.base_url();
    match format {
        FeedFormat::Json => render_json(&events),
        FeedFormat::Rss => render_rss(key, base_url, &events, Utc::now()),
        FeedFormat::Ical => render_ical(base_url, &events, Utc::now()),
    }
}
