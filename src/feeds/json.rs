//! JSON representation of events.

use chrono::{DateTime, Datelike, Timelike};
use chrono_tz::Tz;
use serde::Serialize;

use crate::error::Result;
use crate::models::Event;

/// Calendar fields of a resolved instant in the display timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InstantJson {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
}

impl From<DateTime<Tz>> for InstantJson {
    fn from(at: DateTime<Tz>) -> Self {
        Self {
            year: at.year(),
            month: at.month(),
            day: at.day(),
            hour: at.hour(),
            minute: at.minute(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventJson {
    pub id: String,
    pub title: String,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_time: Option<InstantJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<InstantJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<InstantJson>,
}

impl From<&Event> for EventJson {
    fn from(event: &Event) -> Self {
        let schedule = event.schedule();
        Self {
            id: event.id.clone(),
            title: event.title.clone(),
            year: event.year(),
            month: event.month(),
            day: event.day(),
            place: event.place.clone(),
            open_time: schedule.open.map(InstantJson::from),
            start_time: schedule.start.map(InstantJson::from),
            end_time: schedule.end.map(InstantJson::from),
        }
    }
}

/// Render events as a JSON array in listing order.
pub fn render_json(events: &[Event]) -> Result<String> {
    let items: Vec<EventJson> = events.iter().map(EventJson::from).collect();
    Ok(serde_json::to_string(&items)?)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::{Value, json};

    use super::*;
    use crate::models::{ClockTime, EventTimes};

    #[test]
    fn test_render_json_shape() {
        let mut late = Event::new("1", "Night", NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        late.place = Some("Club".to_string());
        late.times = EventTimes {
            open: Some(ClockTime::new(23, 0)),
            start: None,
            end: Some(ClockTime::new(1, 0)),
        };
        let bare = Event::new("2", "Day", NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());

        let value: Value = serde_json::from_str(&render_json(&[late, bare]).unwrap()).unwrap();
        assert_eq!(
            value,
            json!([
                {
                    "id": "1",
                    "title": "Night",
                    "year": 2024,
                    "month": 12,
                    "day": 31,
                    "place": "Club",
                    "open_time": {"year": 2024, "month": 12, "day": 31, "hour": 23, "minute": 0},
                    "end_time": {"year": 2025, "month": 1, "day": 1, "hour": 1, "minute": 0}
                },
                {"id": "2", "title": "Day", "year": 2025, "month": 1, "day": 2}
            ])
        );
    }
}
