//! Feed renderers over cached events.
//!
//! - `json`: event objects with resolved open/start/end instants
//! - `rss`: RSS 2.0 channel, one item per event
//! - `ical`: iCalendar with one VEVENT per event

pub mod ical;
pub mod json;
pub mod rss;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub use ical::render_ical;
pub use json::{EventJson, render_json};
pub use rss::render_rss;

/// Output formats the service can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedFormat {
    Json,
    Rss,
    Ical,
}

impl FeedFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            FeedFormat::Json => "application/json",
            FeedFormat::Rss => "application/rss+xml; charset=utf-8",
            FeedFormat::Ical => "text/calendar; charset=utf-8",
        }
    }
}

impl FromStr for FeedFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(FeedFormat::Json),
            "rss" => Ok(FeedFormat::Rss),
            "ical" | "ics" => Ok(FeedFormat::Ical),
            other => Err(AppError::validation(format!("unknown feed format: {other}"))),
        }
    }
}

/// Title used for a performer's feeds.
pub fn feed_title(actor_name: &str) -> String {
    format!("{actor_name}のイベント・ライブ情報一覧")
}

/// Escape text for XML element content and attribute values.
pub(crate) fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
