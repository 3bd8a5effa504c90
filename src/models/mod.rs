// src/models/mod.rs

//! Domain models for the feed service.

mod actor;
mod config;
mod event;

// Re-export all public types
pub use actor::{ActorKey, event_link};
pub use config::{CacheConfig, Config, CrawlerConfig, LoggingConfig, ServerConfig};
pub use event::{ClockTime, DISPLAY_TZ, Event, EventTimes, Schedule};
