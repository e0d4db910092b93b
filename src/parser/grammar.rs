//! Trace line grammar.
//!
//! Line shape:
//!
//! ```text
//! [DEBUG:<session>] <timestamp> | <location> | <event_kind> | <payload>
//! ```
//!
//! Parsing is tolerant: a line that carries the marker but does not match
//! the grammar yields `None`, an uninterpretable timestamp falls back to the
//! current time and an unparsable payload is kept as raw text.

use super::payload::Payload;
use super::schema::{EventKind, Location, TraceEvent};
use chrono::{FixedOffset, Local, NaiveDateTime, TimeZone};
use log::{debug, trace};
use regex::Regex;
use std::sync::OnceLock;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const CANONICAL_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

fn line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(concat!(
            r"\[DEBUG:([^|\]]+)\]\s*",
            r"(\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(?:\.\d+)?(?:Z|[+-]\d{2}:?\d{2})?)\s*\|\s*",
            r"([^|]+)\|\s*",
            r"(\w+)\s*\|",
            r"(.*)",
        ))
        .expect("static regex")
    })
}

/// Parse one trace line
///
/// **Public** - main entry point of the grammar
///
/// # Arguments
/// * `line` - Raw captured line (may carry a prefix before the marker)
/// * `ordinal` - 1-based line number within the captured text
///
/// # Returns
/// `None` when the line does not conform to the grammar
pub fn parse_line(line: &str, ordinal: usize) -> Option<TraceEvent> {
    let caps = line_pattern().captures(line)?;

    let session_id = caps[1].trim();
    let location = caps[3].trim();
    if session_id.is_empty() || location.is_empty() {
        trace!("Line {} dropped: empty session or location", ordinal);
        return None;
    }

    let timestamp = parse_timestamp(&caps[2]).unwrap_or_else(|| {
        debug!(
            "Line {}: unparsable timestamp '{}', using current time",
            ordinal, &caps[2]
        );
        Local::now().naive_local()
    });

    Some(TraceEvent {
        session_id: session_id.to_string(),
        timestamp,
        location: Location::parse(location),
        kind: EventKind::from_token(&caps[4]),
        payload: Payload::parse(&caps[5]),
        raw: line.trim().to_string(),
        ordinal,
    })
}

/// Parse an ISO-8601 timestamp
///
/// Accepts `T` or space as separator, optional fractional seconds and an
/// optional `Z`/`±HH:MM` zone. Zoned values are converted to UTC.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.len() < 19 || !text.is_char_boundary(10) || !text.is_char_boundary(11) {
        return None;
    }

    let normalized = format!("{}T{}", &text[..10], &text[11..]);
    let (local_part, offset) = split_zone(&normalized)?;
    let naive = NaiveDateTime::parse_from_str(local_part, TIMESTAMP_FORMAT).ok()?;

    match offset {
        None => Some(naive),
        Some(offset) => offset
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.naive_utc()),
    }
}

/// Separate the zone suffix (if any) from the local date-time part
///
/// **Private** - internal helper for parse_timestamp
fn split_zone(text: &str) -> Option<(&str, Option<FixedOffset>)> {
    if let Some(local) = text.strip_suffix('Z') {
        return Some((local, FixedOffset::east_opt(0)));
    }

    // Zone sign can only appear after the time part (index 19 onwards)
    let sign_pos = text
        .char_indices()
        .skip(19)
        .find(|(_, c)| *c == '+' || *c == '-')
        .map(|(i, _)| i);

    let Some(pos) = sign_pos else {
        return Some((text, None));
    };

    let (local, zone) = text.split_at(pos);
    let sign = if zone.starts_with('-') { -1 } else { 1 };
    let digits: String = zone[1..].chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != 4 {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    let offset = FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))?;

    Some((local, Some(offset)))
}

/// Format a timestamp the way `format_event` writes it (microsecond precision)
pub fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format(CANONICAL_TIMESTAMP_FORMAT).to_string()
}

/// Format an event back into a trace line
///
/// The result parses back to an equal event (timestamp at microsecond
/// precision).
pub fn format_event(event: &TraceEvent) -> String {
    format_line(
        &event.session_id,
        &event.timestamp,
        &event.location,
        &event.kind,
        &event.payload,
    )
}

/// Format the individual parts of a trace line
pub fn format_line(
    session_id: &str,
    timestamp: &NaiveDateTime,
    location: &Location,
    kind: &EventKind,
    payload: &Payload,
) -> String {
    let mut line = format!(
        "[DEBUG:{}] {} | {} | {} |",
        session_id,
        format_timestamp(timestamp),
        location,
        kind
    );

    if !payload.is_empty() {
        line.push(' ');
        line.push_str(&payload.to_string());
    }

    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    fn ts(h: u32, m: u32, s: u32, micro: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_micro_opt(h, m, s, micro)
            .unwrap()
    }

    #[test]
    fn test_parse_full_line() {
        let line = "[DEBUG:a1b2c3d4] 2024-03-15T10:20:30.123456 | process_order:42 | ENTRY | args={\"id\": 7}";
        let event = parse_line(line, 3).unwrap();

        assert_eq!(event.session_id, "a1b2c3d4");
        assert_eq!(event.timestamp, ts(10, 20, 30, 123456));
        assert_eq!(event.location, Location::new("process_order", Some(42)));
        assert_eq!(event.kind, EventKind::Entry);
        assert_eq!(event.ordinal, 3);
        assert!(event.payload.get("args").is_some());
    }

    #[test]
    fn test_parse_with_prefix_and_lowercase_kind() {
        let line = "stdout | [DEBUG:s1] 2024-03-15 10:20:30 | main | exit | return=1";
        let event = parse_line(line, 1).unwrap();
        assert_eq!(event.kind, EventKind::Exit);
        assert_eq!(event.timestamp, ts(10, 20, 30, 0));
    }

    #[test]
    fn test_parse_utc_suffix() {
        let parsed = parse_timestamp("2024-03-15T10:20:30.500Z").unwrap();
        assert_eq!(parsed, ts(10, 20, 30, 500_000));
    }

    #[test]
    fn test_parse_offset_converted_to_utc() {
        let parsed = parse_timestamp("2024-03-15T12:20:30+02:00").unwrap();
        assert_eq!(parsed, ts(10, 20, 30, 0));
        let parsed = parse_timestamp("2024-03-15T08:20:30-0200").unwrap();
        assert_eq!(parsed, ts(10, 20, 30, 0));
    }

    #[test]
    fn test_multibyte_separator_rejected() {
        assert_eq!(parse_timestamp("2024-03-15é10:20:30"), None);
        assert_eq!(parse_timestamp("2024-03-1é 10:20:30"), None);
    }

    #[test]
    fn test_invalid_timestamp_degrades_to_now() {
        let line = "[DEBUG:s1] 2024-13-45T99:99:99 | main | STATE | x=1";
        let event = parse_line(line, 1).unwrap();
        let now = Local::now().naive_local();
        assert!((now - event.timestamp).num_seconds().abs() < 60);
    }

    #[test]
    fn test_malformed_lines_dropped() {
        assert!(parse_line("[DEBUG:s1] not a timestamp | main | ENTRY |", 1).is_none());
        assert!(parse_line("[DEBUG:s1] 2024-03-15T10:20:30 | main | ENTRY", 1).is_none());
        assert!(parse_line("[DEBUG:] 2024-03-15T10:20:30 | main | ENTRY |", 1).is_none());
        assert!(parse_line("plain log line", 1).is_none());
    }

    #[test]
    fn test_format_event_roundtrip() {
        let line = "[DEBUG:s1] 2024-03-15 10:20:30.1234567 | calc:9 | exit | return=None";
        let event = parse_line(line, 1).unwrap();
        let formatted = format_event(&event);
        let reparsed = parse_line(&formatted, 1).unwrap();

        assert_eq!(reparsed.session_id, event.session_id);
        assert_eq!(
            reparsed.timestamp.nanosecond() / 1000,
            event.timestamp.nanosecond() / 1000
        );
        assert_eq!(reparsed.location, event.location);
        assert_eq!(reparsed.kind, event.kind);
        assert_eq!(reparsed.payload, event.payload);
        assert_eq!(format_event(&reparsed), formatted);
    }

    #[test]
    fn test_format_empty_payload() {
        let line = format_line(
            "s1",
            &ts(1, 2, 3, 4),
            &Location::new("main", None),
            &EventKind::Entry,
            &Payload::empty(),
        );
        assert_eq!(line, "[DEBUG:s1] 2024-03-15T01:02:03.000004 | main | ENTRY |");
        assert!(parse_line(&line, 1).unwrap().payload.is_empty());
    }
}
