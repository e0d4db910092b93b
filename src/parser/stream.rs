//! Turn captured text into an ordered sequence of trace events.
//!
//! Order follows line order in the captured text, not timestamp order.
//! Callers that need temporal order sort explicitly.

use super::grammar::parse_line;
use super::schema::TraceEvent;
use crate::utils::config::LOG_MARKER;
use log::debug;
use std::io::Read;
use std::iter::Enumerate;
use std::str::Lines;

/// Lazy iterator over the trace events in a block of text
///
/// **Public** - used by the analysis pipeline
pub struct TraceEventStream<'a> {
    lines: Enumerate<Lines<'a>>,
    session_filter: Option<&'a str>,
    dropped: usize,
}

impl<'a> TraceEventStream<'a> {
    /// Create a stream over `content`, optionally keeping a single session
    pub fn new(content: &'a str, session_filter: Option<&'a str>) -> Self {
        Self {
            lines: content.lines().enumerate(),
            session_filter,
            dropped: 0,
        }
    }

    /// Number of marker-bearing lines that failed the grammar so far
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

impl Iterator for TraceEventStream<'_> {
    type Item = TraceEvent;

    fn next(&mut self) -> Option<TraceEvent> {
        for (index, line) in self.lines.by_ref() {
            // Lines without the marker are never scanned
            if !line.contains(LOG_MARKER) {
                continue;
            }

            let Some(event) = parse_line(line, index + 1) else {
                self.dropped += 1;
                continue;
            };

            match self.session_filter {
                Some(filter) if event.session_id != filter => continue,
                _ => return Some(event),
            }
        }
        None
    }
}

/// Parse all trace events from captured text
///
/// # Arguments
/// * `content` - Captured output (any mix of trace and non-trace lines)
/// * `session_filter` - Keep only events of this session when set
pub fn parse_events(content: &str, session_filter: Option<&str>) -> Vec<TraceEvent> {
    let mut stream = TraceEventStream::new(content, session_filter);
    let events: Vec<TraceEvent> = stream.by_ref().collect();

    if stream.dropped() > 0 {
        debug!("Dropped {} malformed trace lines", stream.dropped());
    }
    debug!("Parsed {} trace events", events.len());

    events
}

/// Read a whole input and parse its trace events
pub fn read_events<R: Read>(
    mut reader: R,
    session_filter: Option<&str>,
) -> std::io::Result<Vec<TraceEvent>> {
    let mut content = String::new();
    reader.read_to_string(&mut content)?;
    Ok(parse_events(&content, session_filter))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = "\
starting server
[DEBUG:aaaa] 2024-03-15T10:00:02 | late:1 | ENTRY | args={}
[DEBUG:bbbb] 2024-03-15T10:00:00 | other | ENTRY |
[DEBUG:aaaa] garbage line
[DEBUG:aaaa] 2024-03-15T10:00:01 | early:1 | ENTRY | args={}
";

    #[test]
    fn test_line_order_preserved() {
        let events = parse_events(LOG, None);
        let names: Vec<&str> = events.iter().map(|e| e.function_name()).collect();
        assert_eq!(names, vec!["late", "other", "early"]);
        assert_eq!(events[0].ordinal, 2);
        assert_eq!(events[2].ordinal, 5);
    }

    #[test]
    fn test_session_filter() {
        let events = parse_events(LOG, Some("aaaa"));
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.session_id == "aaaa"));
    }

    #[test]
    fn test_dropped_count() {
        let mut stream = TraceEventStream::new(LOG, None);
        let count = stream.by_ref().count();
        assert_eq!(count, 3);
        assert_eq!(stream.dropped(), 1);
    }

    #[test]
    fn test_read_events_from_reader() {
        let events = read_events(LOG.as_bytes(), Some("bbbb")).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].function_name(), "other");
    }
}
