//! Pipeline entry points for the feed service.
//!
//! - `run_server`: HTTP feeds with background refresh
//! - `run_crawl`: crawl one performer and render it once
//! - `RefreshWorker`: periodic re-crawl of tracked performers

pub mod crawl;
pub mod refresh;
pub mod serve;

pub use crawl::run_crawl;
pub use refresh::{RefreshWorker, SweepReport};
pub use serve::{build_cache, run_server};
