//! iCalendar (RFC 5545) rendering.

use chrono::{DateTime, TimeZone, Utc};

use crate::error::Result;
use crate::models::{Event, event_link};

const PRODID: &str = "-//eventfeed//eventernote feed//JA";
const MAX_LINE_OCTETS: usize = 75;

/// Render events as a VCALENDAR.
///
/// Events begin at their open time, else their start time. Events with
/// neither become all-day entries on their listed date.
pub fn render_ical(base_url: &str, events: &[Event], stamp: DateTime<Utc>) -> Result<String> {
    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:{PRODID}"),
    ];

    for event in events {
        let schedule = event.schedule();
        lines.push("BEGIN:VEVENT".to_string());
        lines.push(format!("UID:{}", escape_text(&event.id)));
        lines.push(format!("DTSTAMP:{}", utc_stamp(&stamp)));
        lines.push(format!("SUMMARY:{}", escape_text(&event.title)));
        lines.push(format!("URL:{}", event_link(base_url, &event.id)?));
        if let Some(place) = &event.place {
            lines.push(format!("LOCATION:{}", escape_text(place)));
        }

        match schedule.begin() {
            Some(begin) => {
                lines.push(format!("DTSTART:{}", utc_stamp(&begin)));
                if let Some(end) = schedule.end {
                    lines.push(format!("DTEND:{}", utc_stamp(&end)));
                }
            }
            None => {
                lines.push(format!("DTSTART;VALUE=DATE:{}", event.date.format("%Y%m%d")));
            }
        }
        lines.push("END:VEVENT".to_string());
    }
    lines.push("END:VCALENDAR".to_string());

    let mut out = String::new();
    for line in &lines {
        out.push_str(&fold_line(line));
        out.push_str("\r\n");
    }
    Ok(out)
}

fn utc_stamp<Z: TimeZone>(at: &DateTime<Z>) -> String {
    at.with_timezone(&Utc).format("%Y%m%dT%H%M%SZ").to_string()
}

/// Escape a TEXT property value.
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out
}

/// Fold a content line at 75 octets without splitting UTF-8 sequences.
fn fold_line(line: &str) -> String {
    if line.len() <= MAX_LINE_OCTETS {
        return line.to_string();
    }

    let mut out = String::with_capacity(line.len() + line.len() / MAX_LINE_OCTETS * 3);
    let mut used = 0;
    for c in line.chars() {
        if used + c.len_utf8() > MAX_LINE_OCTETS {
            out.push_str("\r\n ");
            used = 1;
        }
        out.push(c);
        used += c.len_utf8();
    }
    out
}
