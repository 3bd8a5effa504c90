//! RSS 2.0 rendering.

use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::feeds::{escape_xml, feed_title};
use crate::models::{ActorKey, Event, event_link};

/// Render a performer's events as an RSS channel.
///
/// Items are dated at midnight of the event day in the display timezone.
pub fn render_rss(
    actor: &ActorKey,
    base_url: &str,
    events: &[Event],
    built_at: DateTime<Utc>,
) -> Result<String> {
    let title = escape_xml(&feed_title(&actor.name));
    let link = escape_xml(actor.events_link(base_url)?.as_str());

    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<rss version=\"2.0\">\n<channel>\n");
    let _ = writeln!(out, "<title>{title}</title>");
    let _ = writeln!(out, "<link>{link}</link>");
    let _ = writeln!(out, "<description>{title}</description>");
    out.push_str("<language>ja</language>\n");
    let _ = writeln!(out, "<lastBuildDate>{}</lastBuildDate>", built_at.to_rfc2822());

    for event in events {
        let item_title = format!(
            "{}/{}/{} {}",
            event.year(),
            event.month(),
            event.day(),
            event.title
        );
        out.push_str("<item>\n");
        let _ = writeln!(out, "<title>{}</title>", escape_xml(&item_title));
        let _ = writeln!(
            out,
            "<link>{}</link>",
            escape_xml(event_link(base_url, &event.id)?.as_str())
        );
        let _ = writeln!(
            out,
            "<guid isPermaLink=\"false\">{}</guid>",
            escape_xml(&event.id)
        );
        if let Some(day_start) = event.day_start() {
            let _ = writeln!(out, "<pubDate>{}</pubDate>", day_start.to_rfc2822());
        }
        out.push_str("</item>\n");
    }

    out.push_str("</channel>\n</rss>\n");
    Ok(out)
}
