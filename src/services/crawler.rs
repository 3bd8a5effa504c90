// src/services/crawler.rs

//! Paginated performer crawler.

use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::models::{ActorKey, CrawlerConfig, Event};
use crate::services::events::EventParser;
use crate::services::fetcher::PageFetcher;

/// Walks a performer's listing page by page until a page comes back empty.
pub struct Crawler {
    fetcher: Arc<dyn PageFetcher>,
    parser: EventParser,
    base_url: String,
    page_size: usize,
    delay: Duration,
}

impl Crawler {
    /// Create a crawler over the given fetcher.
    pub fn new(config: &CrawlerConfig, fetcher: Arc<dyn PageFetcher>) -> Result<Self> {
        Ok(Self {
            fetcher,
            parser: EventParser::new()?,
            base_url: config.base_url.clone(),
            page_size: config.page_size.max(1),
            delay: config.request_delay(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Crawl every page of a performer's listing.
    ///
    /// Events come back in page-then-document order. A fetch error or hard
    /// parsing fault on any page fails the whole crawl.
    pub async fn crawl(&self, key: &ActorKey) -> Result<Vec<Event>> {
        log::info!("Crawling events for {key}");
        let mut events = Vec::new();

        for page in 1.. {
            let url = key.page_url(&self.base_url, page, self.page_size)?;
            log::debug!("Crawling {url}");

            let html = self.fetcher.fetch(url.as_str()).await?;
            let parsed = self.parser.parse(&html, url.as_str())?;
            for warning in &parsed.warnings {
                log::warn!("Parsing warning: {warning}");
            }

            if parsed.is_empty() {
                log::debug!("No more events for {key} at page={page}");
                break;
            }
            events.extend(parsed.events);

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        log::info!("Crawled {} events for {key}", events.len());
        Ok(events)
    }
}
