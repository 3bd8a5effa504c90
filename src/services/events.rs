// src/services/events.rs

//! Event listing page parser.
//!
//! Required fields (detail link, date) raise a hard [`ParsingFault`] that
//! aborts the page. Optional fields (venue, schedule) are skipped and reported
//! as warnings on the returned [`ParsedPage`].

use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, ParsingFault, Result};
use crate::models::Event;
use crate::services::times::TimePatternMatcher;
use crate::utils::normalize_whitespace;

/// Path prefix of event detail links.
pub const EVENT_LINK_PREFIX: &str = "/events/";

const ENTRY_SELECTOR: &str = "li.clearfix";
const TITLE_SELECTOR: &str = "div.event > h4 > a";
const DATE_SELECTOR: &str = "div.date > p";
const PLACE_SELECTOR: &str = "div.event > div.place > a";
const TIME_SELECTOR: &str = "div.event > div.place > span.s";

/// Events of one listing page plus the soft faults met while reading it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    pub events: Vec<Event>,
    pub warnings: Vec<ParsingFault>,
}

impl ParsedPage {
    /// An empty page marks the end of a listing.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

struct EventSelectors {
    entry: Selector,
    title: Selector,
    date: Selector,
    place: Selector,
    time: Selector,
}

/// Turns listing HTML into [`Event`] records.
pub struct EventParser {
    selectors: EventSelectors,
    date_re: Regex,
    matcher: TimePatternMatcher,
}

impl EventParser {
    /// Create a parser using the standard schedule layouts.
    pub fn new() -> Result<Self> {
        Self::with_matcher(TimePatternMatcher::standard())
    }

    /// Create a parser with a custom schedule matcher.
    pub fn with_matcher(matcher: TimePatternMatcher) -> Result<Self> {
        Ok(Self {
            selectors: EventSelectors {
                entry: parse_selector(ENTRY_SELECTOR)?,
                title: parse_selector(TITLE_SELECTOR)?,
                date: parse_selector(DATE_SELECTOR)?,
                place: parse_selector(PLACE_SELECTOR)?,
                time: parse_selector(TIME_SELECTOR)?,
            },
            date_re: Regex::new(r"^(\d{4})-(\d{2})-(\d{2})")
                .map_err(|e| AppError::validation(format!("date pattern: {e}")))?,
            matcher,
        })
    }

    /// Parse every event entry of a page, in document order.
    pub fn parse(&self, html: &str, url: &str) -> Result<ParsedPage> {
        let document = Html::parse_document(html);
        let root = ParsingFault::new(url);
        let mut page = ParsedPage::default();

        for (i, entry) in document.select(&self.selectors.entry).enumerate() {
            let fault = root.layer(format!("{ENTRY_SELECTOR}[{i}]"));
            let event = self.parse_entry(&entry, &fault, &mut page.warnings)?;
            page.events.push(event);
        }

        Ok(page)
    }

    fn parse_entry(
        &self,
        entry: &ElementRef,
        fault: &ParsingFault,
        warnings: &mut Vec<ParsingFault>,
    ) -> Result<Event> {
        let (id, title) = self.parse_title(entry, fault)?;
        let date = self.parse_date(entry, fault)?;
        let mut event = Event::new(id, title, date);

        match entry.select(&self.selectors.place).next() {
            Some(place) => event.place = Some(text_of(&place)),
            None => warnings.push(fault.with_message("cannot find place")),
        }

        match entry.select(&self.selectors.time).next() {
            Some(span) => {
                let result = self.matcher.match_text(&text_of(&span));
                let time_fault = fault.layer(TIME_SELECTOR);
                warnings.extend(result.warnings.into_iter().map(|w| time_fault.with_message(w)));
                event.times = result.times;
            }
            None => warnings.push(fault.with_message("cannot find time span")),
        }

        Ok(event)
    }

    fn parse_title(&self, entry: &ElementRef, fault: &ParsingFault) -> Result<(String, String)> {
        let link = entry
            .select(&self.selectors.title)
            .next()
            .ok_or_else(|| fault.with_message("cannot find title link"))?;

        let href = link.value().attr("href").unwrap_or_default();
        let id = href
            .strip_prefix(EVENT_LINK_PREFIX)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                fault.with_message(format!(
                    "title link href {href:?} does not start with {EVENT_LINK_PREFIX}"
                ))
            })?;

        Ok((id.to_string(), text_of(&link)))
    }

    fn parse_date(&self, entry: &ElementRef, fault: &ParsingFault) -> Result<NaiveDate> {
        let node = entry
            .select(&self.selectors.date)
            .next()
            .ok_or_else(|| fault.with_message("cannot find date"))?;
        let text = text_of(&node);

        let caps = self
            .date_re
            .captures(&text)
            .ok_or_else(|| fault.with_message(format!("date {text:?} does not match YYYY-MM-DD")))?;
        let parts: Vec<u32> = caps
            .iter()
            .skip(1)
            .flatten()
            .filter_map(|m| m.as_str().parse().ok())
            .collect();
        let &[year, month, day] = parts.as_slice() else {
            return Err(fault
                .with_message(format!("date {text:?} matches are not of length 3"))
                .into());
        };

        NaiveDate::from_ymd_opt(year as i32, month, day)
            .ok_or_else(|| fault.with_message(format!("date {text:?} is not a calendar day")).into())
    }
}

fn text_of(element: &ElementRef) -> String {
    normalize_whitespace(&element.text().collect::<String>())
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}
