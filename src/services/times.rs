// src/services/times.rs

//! Ordered fallback matching for free-text schedule descriptions.
//!
//! The source site renders partial schedules inconsistently, e.g.
//! `開場 - 開演 18:00 終演 20:00` when there is no door time. Each known layout
//! is one row of a table; rows are tried top to bottom and the first row whose
//! pattern matches with the expected number of groups wins.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{ClockTime, EventTimes};
use crate::utils::normalize_whitespace;

/// Which times a pattern's groups fill, in capture order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeLayout {
    /// open, start, end
    Full,
    /// start, end
    NoOpen,
    /// open, end
    NoStart,
}

impl TimeLayout {
    /// Number of capture groups the layout expects (hour and minute per time).
    pub fn arity(self) -> usize {
        match self {
            TimeLayout::Full => 6,
            TimeLayout::NoOpen | TimeLayout::NoStart => 4,
        }
    }

    fn apply(self, values: &[u32]) -> EventTimes {
        let at = |i: usize| Some(ClockTime::new(values[i], values[i + 1]));
        match self {
            TimeLayout::Full => EventTimes {
                open: at(0),
                start: at(2),
                end: at(4),
            },
            TimeLayout::NoOpen => EventTimes {
                open: None,
                start: at(0),
                end: at(2),
            },
            TimeLayout::NoStart => EventTimes {
                open: at(0),
                start: None,
                end: at(2),
            },
        }
    }
}

/// One row of the matcher table.
#[derive(Debug, Clone)]
pub struct TimePattern {
    pub name: String,
    pub regex: Regex,
    pub layout: TimeLayout,
}

impl TimePattern {
    pub fn new(name: impl Into<String>, regex: Regex, layout: TimeLayout) -> Self {
        Self {
            name: name.into(),
            regex,
            layout,
        }
    }

    /// Try the row against normalised text.
    fn extract(&self, text: &str) -> Extraction {
        let Some(caps) = self.regex.captures(text) else {
            return Extraction::NoMatch;
        };

        let values: Vec<u32> = caps
            .iter()
            .skip(1)
            .flatten()
            .filter_map(|m| m.as_str().parse().ok())
            .collect();

        if values.len() != self.layout.arity() {
            return Extraction::Mismatch(format!(
                "{} is not of length {} (got {})",
                self.name,
                self.layout.arity(),
                values.len()
            ));
        }

        Extraction::Matched(self.layout.apply(&values))
    }
}

enum Extraction {
    NoMatch,
    Mismatch(String),
    Matched(EventTimes),
}

/// Outcome of matching one schedule text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeMatch {
    /// Times set by the winning row; all unset when nothing matched
    pub times: EventTimes,

    /// Name of the winning row
    pub pattern: Option<String>,

    /// Non-fatal problems met along the way
    pub warnings: Vec<String>,
}

static STANDARD_PATTERNS: LazyLock<Vec<TimePattern>> = LazyLock::new(|| {
    let row = |name: &str, pattern: &str, layout| {
        TimePattern::new(
            name,
            Regex::new(pattern).expect("valid time pattern"),
            layout,
        )
    };
    vec![
        row(
            "full",
            r"^開場 (\d{2}):(\d{2}) 開演 (\d{2}):(\d{2}) 終演 (\d{2}):(\d{2})",
            TimeLayout::Full,
        ),
        row(
            "no_open",
            r"^開場 - 開演 (\d{2}):(\d{2}) 終演 (\d{2}):(\d{2})",
            TimeLayout::NoOpen,
        ),
        row(
            "no_start",
            r"^開場 (\d{2}):(\d{2}) 開演 - 終演 (\d{2}):(\d{2})",
            TimeLayout::NoStart,
        ),
    ]
});

/// Tries schedule layouts in order and applies the first that matches.
#[derive(Debug, Clone)]
pub struct TimePatternMatcher {
    patterns: Vec<TimePattern>,
}

impl TimePatternMatcher {
    /// Create a matcher from an ordered table.
    pub fn new(patterns: Vec<TimePattern>) -> Self {
        Self { patterns }
    }

    /// The three layouts the source site is known to use.
    pub fn standard() -> Self {
        Self::new(STANDARD_PATTERNS.clone())
    }

    /// Match a schedule description.
    pub fn match_text(&self, text: &str) -> TimeMatch {
        let text = normalize_whitespace(text);
        let mut warnings = Vec::new();

        for pattern in &self.patterns {
            match pattern.extract(&text) {
                Extraction::Matched(times) => {
                    return TimeMatch {
                        times,
                        pattern: Some(pattern.name.clone()),
                        warnings,
                    };
                }
                Extraction::Mismatch(warning) => warnings.push(warning),
                Extraction::NoMatch => {}
            }
        }

        warnings.push(format!("{text} cannot match any time pattern"));
        TimeMatch {
            times: EventTimes::default(),
            pattern: None,
            warnings,
        }
    }
}

impl Default for TimePatternMatcher {
    fn default() -> Self {
        Self::standard()
    }
}
