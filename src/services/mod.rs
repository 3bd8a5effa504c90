//! Service layer for the feed service.
//!
//! This module contains the crawl-and-normalize logic:
//! - Page fetching (`PageFetcher`, `HttpFetcher`)
//! - Schedule text matching (`TimePatternMatcher`)
//! - Listing page parsing (`EventParser`)
//! - Pagination (`Crawler`)

mod crawler;
mod events;
mod fetcher;
mod times;

pub use crawler::Crawler;
pub use events::{EVENT_LINK_PREFIX, EventParser, ParsedPage};
pub use fetcher::{HttpFetcher, PageFetcher};
pub use times::{TimeLayout, TimeMatch, TimePattern, TimePatternMatcher};

#[cfg(test)]
pub(crate) use crawler::tests as crawler_tests;
#[cfg(test)]
pub(crate) use events::tests as event_tests;
