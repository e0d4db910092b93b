//! Full analysis pipeline: parse, reconstruct, detect.

use super::anomalies::{detect_anomalies, Anomaly, AnomalyConfig};
use super::call_tree::{reconstruct, CallFrame};
use crate::parser::{parse_events, EventKind, TraceEvent};
use chrono::NaiveDateTime;
use log::{debug, info};
use std::collections::BTreeSet;

/// Session label used when events from several sessions are mixed
pub const MULTIPLE_SESSIONS: &str = "multiple";

/// Session label used when no event was parsed
pub const UNKNOWN_SESSION: &str = "unknown";

/// Complete analysis of a captured log
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    /// Filter value, the single observed session, or a placeholder label
    pub session_id: String,

    pub total_events: usize,

    /// Earliest and latest timestamp
    pub time_span: Option<(NaiveDateTime, NaiveDateTime)>,

    /// Distinct function names (sorted)
    pub functions: BTreeSet<String>,

    /// Call frames in completion order
    pub calls: Vec<CallFrame>,

    pub anomalies: Vec<Anomaly>,

    /// All STATE events in stream order
    pub state_changes: Vec<TraceEvent>,

    /// STATE events observed outside any call
    pub orphan_states: Vec<TraceEvent>,

    pub dangling_exits: Vec<TraceEvent>,
}

impl AnalysisResult {
    fn empty(session_filter: Option<&str>) -> Self {
        Self {
            session_id: session_filter.unwrap_or(UNKNOWN_SESSION).to_string(),
            total_events: 0,
            time_span: None,
            functions: BTreeSet::new(),
            calls: Vec::new(),
            anomalies: Vec::new(),
            state_changes: Vec::new(),
            orphan_states: Vec::new(),
            dangling_exits: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_events == 0
    }
}

/// Analyze captured text
///
/// **Public** - main entry point for analysis
///
/// # Arguments
/// * `content` - Captured output containing trace lines
/// * `session_filter` - Restrict analysis to one session
/// * `config` - Anomaly check tunables
pub fn analyze_logs(
    content: &str,
    session_filter: Option<&str>,
    config: &AnomalyConfig,
) -> AnalysisResult {
    info!("Parsing trace events...");
    let events = parse_events(content, session_filter);
    analyze_events(events, session_filter, config)
}

/// Analyze already-parsed events
pub fn analyze_events(
    events: Vec<TraceEvent>,
    session_filter: Option<&str>,
    config: &AnomalyConfig,
) -> AnalysisResult {
    if events.is_empty() {
        return AnalysisResult::empty(session_filter);
    }

    let session_id = resolve_session_label(&events, session_filter);

    let time_span = events
        .iter()
        .map(|e| e.timestamp)
        .min()
        .zip(events.iter().map(|e| e.timestamp).max());

    let functions: BTreeSet<String> = events
        .iter()
        .map(|e| e.function_name())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();

    info!("Reconstructing execution trace from {} events...", events.len());
    let trace = reconstruct(&events);

    info!("Detecting anomalies...");
    let anomalies = detect_anomalies(&events, &trace, config);

    let state_changes: Vec<TraceEvent> = events
        .iter()
        .filter(|e| e.kind == EventKind::State)
        .cloned()
        .collect();

    debug!(
        "Session '{}': {} functions, {} calls, {} state changes",
        session_id,
        functions.len(),
        trace.calls.len(),
        state_changes.len()
    );

    AnalysisResult {
        session_id,
        total_events: events.len(),
        time_span,
        functions,
        calls: trace.calls,
        anomalies,
        state_changes,
        orphan_states: trace.orphan_states,
        dangling_exits: trace.dangling_exits,
    }
}

/// Pick the session label for a result
///
/// **Private** - internal helper for analyze_events
fn resolve_session_label(events: &[TraceEvent], session_filter: Option<&str>) -> String {
    if let Some(filter) = session_filter {
        return filter.to_string();
    }

    let sessions: BTreeSet<&str> = events.iter().map(|e| e.session_id.as_str()).collect();
    match sessions.len() {
        1 => sessions
            .into_iter()
            .next()
            .unwrap_or(UNKNOWN_SESSION)
            .to_string(),
        _ => MULTIPLE_SESSIONS.to_string(),
    }
}
