//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Cache freshness and failure policy
    #[serde(default)]
    pub cache: CacheConfig,

    /// HTTP server binding
    #[serde(default)]
    pub server: ServerConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| AppError::config(format!("cannot read {}: {e}", path.display())))?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Apply `EVENT_EXPIRE_SECONDS` and `PORT` from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(secs) = lookup("EVENT_EXPIRE_SECONDS") {
            match secs.trim().parse() {
                Ok(secs) => self.cache.expire_secs = secs,
                Err(e) => log::warn!("Ignoring EVENT_EXPIRE_SECONDS={secs:?}: {e}"),
            }
        }

        if let Some(port) = lookup("PORT") {
            match port.trim().parse() {
                Ok(port) => self.server.port = port,
                Err(e) => log::warn!("Ignoring PORT={port:?}: {e}"),
            }
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.page_size == 0 {
            return Err(AppError::validation("crawler.page_size must be > 0"));
        }
        if self.crawler.max_concurrent == 0 {
            return Err(AppError::validation("crawler.max_concurrent must be > 0"));
        }
        if url::Url::parse(&self.crawler.base_url).is_err() {
            return Err(AppError::validation(format!(
                "crawler.base_url is not a valid URL: {}",
                self.crawler.base_url
            )));
        }
        if self.cache.expire_secs == 0 {
            return Err(AppError::validation("cache.expire_secs must be > 0"));
        }
        Ok(())
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Root of the source site
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Events requested per listing page
    #[serde(default = "defaults::page_size")]
    pub page_size: usize,

    /// Delay between listing pages in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Maximum performers refreshed at once by the background worker
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,
}

impl CrawlerConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            page_size: defaults::page_size(),
            request_delay_ms: defaults::request_delay(),
            max_concurrent: defaults::max_concurrent(),
        }
    }
}

/// Cache freshness and failure policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Age after which cached events are re-crawled; also the refresh interval
    #[serde(default = "defaults::expire_secs")]
    pub expire_secs: u64,

    /// Serve the last good crawl when a refresh fails
    #[serde(default = "defaults::serve_stale")]
    pub serve_stale: bool,
}

impl CacheConfig {
    pub fn expiry(&self) -> Duration {
        Duration::from_secs(self.expire_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            expire_secs: defaults::expire_secs(),
            serve_stale: defaults::serve_stale(),
        }
    }
}

/// HTTP server binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "defaults::host")]
    pub host: String,

    #[serde(default = "defaults::port")]
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::host(),
            port: defaults::port(),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    // Crawler defaults
    pub fn base_url() -> String {
        "https://www.eventernote.com".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; eventfeed/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn page_size() -> usize {
        100
    }
    pub fn request_delay() -> u64 {
        0
    }
    pub fn max_concurrent() -> usize {
        4
    }

    // Cache defaults
    pub fn expire_secs() -> u64 {
        6 * 60 * 60
    }
    pub fn serve_stale() -> bool {
        true
    }

    // Server defaults
    pub fn host() -> String {
        "0.0.0.0".into()
    }
    pub fn port() -> u16 {
        5000
    }

    pub fn log_level() -> String {
        "info".into()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.crawler.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_expiry() {
        let mut config = Config::default();
        config.cache.expire_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_base_url() {
        let mut config = Config::default();
        config.crawler.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[cache]\nexpire_secs = 60\n\n[server]\nport = 8080").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.cache.expire_secs, 60);
        assert!(config.cache.serve_stale);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.crawler.page_size, 100);
        assert_eq!(config.crawler.base_url, "https://www.eventernote.com");
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, AppError::Config(ref m) if m.contains("missing.toml")));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(dir.path().join("missing.toml"));
        assert_eq!(config.cache.expire_secs, 21600);
    }

    #[test]
    fn test_env_overrides() {
        let vars = HashMap::from([
            ("EVENT_EXPIRE_SECONDS", "120".to_string()),
            ("PORT", "not-a-port".to_string()),
        ]);
        let mut config = Config::default();
        config.apply_overrides(|name| vars.get(name).cloned());

        assert_eq!(config.cache.expire_secs, 120);
        assert_eq!(config.server.port, 5000);
    }
}
