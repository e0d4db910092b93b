//! Rebuild nested call history from trace events.
//!
//! Events are replayed in timestamp order (ties keep stream order) against
//! a call stack. An EXIT closes the innermost open frame with the same
//! name, so recursive and re-entrant calls pair up correctly:
//!
//! ```text
//! ENTRY f, ENTRY f, EXIT f, EXIT f  ->  f (inner) closes, then f (outer)
//! ```

use crate::parser::{EventKind, PayloadValue, TraceEvent};
use chrono::TimeDelta;
use log::debug;

/// One reconstructed function invocation
///
/// **Public** - read-only once produced by `reconstruct`
#[derive(Debug, Clone, PartialEq)]
pub struct CallFrame {
    name: String,
    entry: TraceEvent,
    exit: Option<TraceEvent>,
    states: Vec<TraceEvent>,
    duration: Option<TimeDelta>,
}

impl CallFrame {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entry(&self) -> &TraceEvent {
        &self.entry
    }

    pub fn exit(&self) -> Option<&TraceEvent> {
        self.exit.as_ref()
    }

    /// STATE events observed while this frame was innermost
    pub fn states(&self) -> &[TraceEvent] {
        &self.states
    }

    /// `exit.timestamp - entry.timestamp`; `None` until the EXIT was seen
    pub fn duration(&self) -> Option<TimeDelta> {
        self.duration
    }

    pub fn duration_ms(&self) -> Option<f64> {
        self.duration.map(delta_to_ms)
    }

    pub fn is_closed(&self) -> bool {
        self.exit.is_some()
    }

    /// `args` field of the ENTRY payload, if any
    pub fn args(&self) -> Option<&PayloadValue> {
        self.entry.payload.get("args")
    }

    /// `return` field of the EXIT payload, if any
    pub fn return_value(&self) -> Option<&PayloadValue> {
        self.exit.as_ref().and_then(|e| e.payload.get("return"))
    }
}

/// A frame still on the call stack
///
/// **Private** - only the reconstructor mutates frames
#[derive(Debug)]
struct OpenFrame {
    entry: TraceEvent,
    states: Vec<TraceEvent>,
}

impl OpenFrame {
    fn new(entry: TraceEvent) -> Self {
        Self {
            entry,
            states: Vec::new(),
        }
    }

    fn name(&self) -> &str {
        self.entry.function_name()
    }

    fn close(self, exit: TraceEvent) -> CallFrame {
        let duration = exit.timestamp - self.entry.timestamp;
        CallFrame {
            name: self.entry.function_name().to_string(),
            entry: self.entry,
            exit: Some(exit),
            states: self.states,
            duration: Some(duration),
        }
    }

    fn abandon(self) -> CallFrame {
        CallFrame {
            name: self.entry.function_name().to_string(),
            entry: self.entry,
            exit: None,
            states: self.states,
            duration: None,
        }
    }
}

/// Output of `reconstruct`
#[derive(Debug, Clone, Default)]
pub struct Reconstruction {
    /// Frames in completion order; unclosed frames follow, innermost first
    pub calls: Vec<CallFrame>,

    /// STATE events seen while the stack was empty
    pub orphan_states: Vec<TraceEvent>,

    /// EXIT events with no open frame of the same name
    pub dangling_exits: Vec<TraceEvent>,
}

impl Reconstruction {
    pub fn unclosed(&self) -> impl Iterator<Item = &CallFrame> {
        self.calls.iter().filter(|c| !c.is_closed())
    }
}

/// Rebuild call frames from events
///
/// **Public** - main entry point for reconstruction
///
/// # Arguments
/// * `events` - Parsed events in any order
///
/// # Algorithm
/// 1. Sort by timestamp, ties broken by stream ordinal
/// 2. ENTRY pushes a new frame
/// 3. EXIT closes the nearest open frame of that name (from the top)
/// 4. STATE attaches to the top frame, or is kept as orphaned
/// 5. Frames left on the stack are emitted without an EXIT
pub fn reconstruct(events: &[TraceEvent]) -> Reconstruction {
    let mut ordered: Vec<&TraceEvent> = events.iter().collect();
    ordered.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then(a.ordinal.cmp(&b.ordinal))
    });

    let mut stack: Vec<OpenFrame> = Vec::new();
    let mut result = Reconstruction::default();

    for event in ordered {
        match event.kind {
            EventKind::Entry => stack.push(OpenFrame::new(event.clone())),
            EventKind::Exit => {
                let name = event.function_name();
                match stack.iter().rposition(|frame| frame.name() == name) {
                    Some(index) => {
                        let frame = stack.remove(index);
                        result.calls.push(frame.close(event.clone()));
                    }
                    None => {
                        debug!("Dangling EXIT for '{}' at line {}", name, event.ordinal);
                        result.dangling_exits.push(event.clone());
                    }
                }
            }
            EventKind::State => match stack.last_mut() {
                Some(frame) => frame.states.push(event.clone()),
                None => result.orphan_states.push(event.clone()),
            },
            EventKind::Error | EventKind::Other(_) => {}
        }
    }

    while let Some(frame) = stack.pop() {
        result.calls.push(frame.abandon());
    }

    debug!(
        "Reconstructed {} calls ({} unclosed, {} dangling exits, {} orphaned states)",
        result.calls.len(),
        result.unclosed().count(),
        result.dangling_exits.len(),
        result.orphan_states.len()
    );

    result
}

/// Convert a time delta to fractional milliseconds
pub fn delta_to_ms(delta: TimeDelta) -> f64 {
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1000.0,
        None => delta.num_milliseconds() as f64,
    }
}
