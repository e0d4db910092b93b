//! Trace line grammar and event stream.
//!
//! This module handles:
//! - Parsing and formatting single trace lines
//! - Tagged JSON-or-raw payloads
//! - Turning captured text into an ordered event sequence

pub mod grammar;
pub mod payload;
pub mod schema;
pub mod stream;

// Re-export main types
pub use grammar::{format_event, format_line, format_timestamp, parse_line, parse_timestamp};
pub use payload::{Payload, PayloadShape, PayloadValue};
pub use schema::{EventKind, Location, TraceEvent};
pub use stream::{parse_events, read_events, TraceEventStream};
