// src/services/fetcher.rs

//! Listing page fetchers.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::CrawlerConfig;
use crate::utils::http;

/// Retrieves raw HTML for a fully formed listing URL.
///
/// Implementations do not retry; a failure aborts the enclosing crawl.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Fetcher backed by a shared `reqwest` client.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher with the configured user agent and timeout.
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        Ok(Self {
            client: http::create_async_client(config)?,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        http::fetch_text(&self.client, url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_fetcher_from_default_config() {
        assert!(HttpFetcher::new(&CrawlerConfig::default()).is_ok());
    }
}
