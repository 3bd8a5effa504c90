// src/pipeline/serve.rs

//! Long-running feed service: HTTP server plus background refresh.

use std::sync::Arc;

use tokio::net::TcpListener;

use crate::error::Result;
use crate::models::Config;
use crate::pipeline::RefreshWorker;
use crate::server::{AppState, router};
use crate::services::{Crawler, HttpFetcher};
use crate::storage::EventCache;

/// Build the shared cache over a live HTTP fetcher.
pub fn build_cache(config: &Config) -> Result<Arc<EventCache>> {
    let fetcher = Arc::new(HttpFetcher::new(&config.crawler)?);
    let crawler = Crawler::new(&config.crawler, fetcher)?;
    Ok(Arc::new(EventCache::new(crawler, &config.cache)))
}

/// Serve feeds until ctrl-c, refreshing tracked performers in the background.
pub async fn run_server(config: &Config) -> Result<()> {
    config.validate()?;
    log::info!("EVENT_EXPIRE_SECONDS={}", config.cache.expire_secs);

    let cache = build_cache(config)?;
    let worker = RefreshWorker::new(Arc::clone(&cache), config.crawler.max_concurrent).spawn();

    let addr = config.server.bind_addr();
    let listener = TcpListener::bind(&addr).await?;
    log::info!("Listening on http://{addr}");

    let served = axum::serve(listener, router(AppState::new(cache)))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    worker.abort();
    log::info!("Server stopped");
    Ok(served?)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    log::info!("Shutdown signal received");
}
