//! Event data structure.

use std::fmt;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Timezone the source site lists its schedules in.
pub const DISPLAY_TZ: Tz = chrono_tz::Asia::Tokyo;

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Wall-clock time as printed on a listing.
///
/// Hours are not capped at 23; listings occasionally use `25:00`-style
/// late-night times, which resolve to the following day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClockTime {
    pub hour: u32,
    pub minute: u32,
}

impl ClockTime {
    pub fn new(hour: u32, minute: u32) -> Self {
        Self { hour, minute }
    }

    fn offset(self) -> Duration {
        Duration::minutes(self.minutes())
    }

    fn minutes(self) -> i64 {
        i64::from(self.hour) * 60 + i64::from(self.minute)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Door, curtain and finish times of an event. Any subset may be present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTimes {
    pub open: Option<ClockTime>,
    pub start: Option<ClockTime>,
    pub end: Option<ClockTime>,
}

impl EventTimes {
    /// Gate time: open if known, otherwise start.
    pub fn gate(&self) -> Option<ClockTime> {
        self.open.or(self.start)
    }

    /// Whether the end time belongs to a day after the listed date.
    pub fn end_rolls_over(&self) -> bool {
        self.end_rollover_days() > 0
    }

    /// Whole days added to the end time so that it falls strictly after the
    /// gate time. More than one only for late-night gates such as `26:00`.
    pub fn end_rollover_days(&self) -> i64 {
        match (self.gate(), self.end) {
            (Some(gate), Some(end)) if end.minutes() <= gate.minutes() => {
                (gate.minutes() - end.minutes()) / MINUTES_PER_DAY + 1
            }
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_none() && self.start.is_none() && self.end.is_none()
    }
}

/// Absolute instants of an event in the display timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub open: Option<DateTime<Tz>>,
    pub start: Option<DateTime<Tz>>,
    pub end: Option<DateTime<Tz>>,
}

impl Schedule {
    /// When the event begins for calendar purposes.
    pub fn begin(&self) -> Option<DateTime<Tz>> {
        self.open.or(self.start)
    }
}

/// One scraped event of a performer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Identifier taken from the detail link (`/events/{id}`)
    pub id: String,

    /// Event title
    pub title: String,

    /// Listed date
    pub date: NaiveDate,

    /// Venue name, when the listing has one
    pub place: Option<String>,

    /// Listed times
    #[serde(default)]
    pub times: EventTimes,
}

impl Event {
    pub fn new(id: impl Into<String>, title: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            date,
            place: None,
            times: EventTimes::default(),
        }
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn month(&self) -> u32 {
        self.date.month()
    }

    pub fn day(&self) -> u32 {
        self.date.day()
    }

    /// Combine the date and listed times into absolute instants.
    pub fn schedule(&self) -> Schedule {
        let midnight = self.date.and_time(NaiveTime::MIN);
        let at = |time: Option<ClockTime>, extra_days: i64| {
            time.and_then(|t| localize(midnight + t.offset() + Duration::days(extra_days)))
        };

        Schedule {
            open: at(self.times.open, 0),
            start: at(self.times.start, 0),
            end: at(self.times.end, self.times.end_rollover_days()),
        }
    }

    /// Midnight of the listed date in the display timezone.
    pub fn day_start(&self) -> Option<DateTime<Tz>> {
        localize(self.date.and_time(NaiveTime::MIN))
    }
}

fn localize(naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    DISPLAY_TZ.from_local_datetime(&naive).earliest()
}
