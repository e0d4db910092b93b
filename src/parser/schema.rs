//! Trace event data model.
//!
//! A `TraceEvent` is one parsed trace line. Events are produced by the
//! grammar and never mutated afterwards; reconstruction and anomaly
//! detection only read them.

use super::payload::Payload;
use chrono::NaiveDateTime;
use std::fmt;

/// Kind of trace event (the fourth field of a trace line)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    Entry,
    Exit,
    State,
    Error,
    /// Any other word, kept upper-cased and otherwise opaque
    Other(String),
}

impl EventKind {
    /// Build from a raw token, normalizing case
    pub fn from_token(token: &str) -> Self {
        let upper = token.trim().to_ascii_uppercase();
        match upper.as_str() {
            "ENTRY" => EventKind::Entry,
            "EXIT" => EventKind::Exit,
            "STATE" => EventKind::State,
            "ERROR" => EventKind::Error,
            _ => EventKind::Other(upper),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventKind::Entry => "ENTRY",
            EventKind::Exit => "EXIT",
            EventKind::State => "STATE",
            EventKind::Error => "ERROR",
            EventKind::Other(name) => name,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an event was emitted: function name plus optional source line
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub function: String,
    pub line: Option<u32>,
}

impl Location {
    pub fn new(function: impl Into<String>, line: Option<u32>) -> Self {
        Self {
            function: function.into(),
            line,
        }
    }

    /// Split on the first `:`; a missing or non-numeric suffix leaves only
    /// the function name.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        match text.split_once(':') {
            Some((function, suffix)) => Self {
                function: function.trim().to_string(),
                line: suffix.trim().parse::<u32>().ok(),
            },
            None => Self {
                function: text.to_string(),
                line: None,
            },
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}", self.function, line),
            None => f.write_str(&self.function),
        }
    }
}

/// One parsed trace line
#[derive(Debug, Clone, PartialEq)]
pub struct TraceEvent {
    /// Correlation token of the capture run
    pub session_id: String,

    pub timestamp: NaiveDateTime,

    pub location: Location,

    pub kind: EventKind,

    pub payload: Payload,

    /// The trimmed source line the event was parsed from
    pub raw: String,

    /// 1-based line number in the captured text
    pub ordinal: usize,
}

impl TraceEvent {
    pub fn function_name(&self) -> &str {
        &self.location.function
    }
}
