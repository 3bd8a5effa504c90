//! Performer identity and source-site links.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Result;

/// Identifies one tracked performer listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorKey {
    /// Display name as used in the site's URLs
    pub name: String,

    /// Numeric performer id on the site
    pub id: u64,
}

impl ActorKey {
    pub fn new(name: impl Into<String>, id: u64) -> Self {
        Self {
            name: name.into(),
            id,
        }
    }

    /// Link to the performer's event listing.
    pub fn events_link(&self, base_url: &str) -> Result<Url> {
        let id = self.id.to_string();
        let mut url = Url::parse(base_url)?;
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(["actors", self.name.as_str(), id.as_str(), "events"]);
        Ok(url)
    }

    /// URL of one listing page.
    pub fn page_url(&self, base_url: &str, page: usize, page_size: usize) -> Result<Url> {
        let mut url = self.events_link(base_url)?;
        url.query_pairs_mut()
            .append_pair("actor_id", &self.id.to_string())
            .append_pair("limit", &page_size.to_string())
            .append_pair("page", &page.to_string());
        Ok(url)
    }
}

impl fmt::Display for ActorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.id)
    }
}

/// Link to a single event's detail page.
pub fn event_link(base_url: &str, event_id: &str) -> Result<Url> {
    let mut url = Url::parse(base_url)?;
    url.path_segments_mut()
        .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .extend(["events", event_id]);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://www.eventernote.com";

    #[test]
    fn test_events_link_encodes_name() {
        let key = ActorKey::new("三森すずこ", 2634);
        assert_eq!(
            key.events_link(BASE).unwrap().as_str(),
            "https://www.eventernote.com/actors/%E4%B8%89%E6%A3%AE%E3%81%99%E3%81%9A%E3%81%93/2634/events"
        );
    }

    #[test]
    fn test_page_url_query() {
        let key = ActorKey::new("someone", 42);
        let url = key.page_url(BASE, 3, 100).unwrap();
        assert_eq!(url.path(), "/actors/someone/42/events");
        assert_eq!(url.query(), Some("actor_id=42&limit=100&page=3"));
    }

    #[test]
    fn test_event_link() {
        assert_eq!(
            event_link("https://www.eventernote.com/", "98765").unwrap().as_str(),
            "https://www.eventernote.com/events/98765"
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(ActorKey::new("someone", 7).to_string(), "someone(7)");
    }
}
