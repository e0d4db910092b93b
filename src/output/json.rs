//! JSON report output.
//!
//! The report is a condensed mirror of `AnalysisResult`: full anomalies,
//! but only a summary per call frame.

use crate::aggregator::{AnalysisResult, Anomaly, CallFrame};
use crate::parser::format_timestamp;
use crate::utils::config::SCHEMA_VERSION;
use crate::utils::error::OutputError;
use log::debug;
use serde::Serialize;

/// Top-level JSON report
#[derive(Debug, Clone, Serialize)]
pub struct JsonReport {
    /// Report schema version
    pub version: String,
    pub session_id: String,
    pub total_entries: usize,
    /// `[first, last]` timestamps, both null when nothing was parsed
    pub time_range: [Option<String>; 2],
    pub functions_called: Vec<String>,
    pub anomalies: Vec<Anomaly>,
    pub execution_trace: Vec<TraceEntry>,
    pub state_change_count: usize,
    pub orphan_state_count: usize,
    pub dangling_exit_count: usize,
}

/// One call frame in the JSON report
#[derive(Debug, Clone, Serialize)]
pub struct TraceEntry {
    pub name: String,
    pub duration_ms: Option<f64>,
    pub has_exit: bool,
    pub state_count: usize,
}

impl From<&CallFrame> for TraceEntry {
    fn from(call: &CallFrame) -> Self {
        Self {
            name: call.name().to_string(),
            duration_ms: call.duration_ms(),
            has_exit: call.is_closed(),
            state_count: call.states().len(),
        }
    }
}

/// Build the serializable report
///
/// **Public** - exposed for tests and library users
pub fn to_report(result: &AnalysisResult) -> JsonReport {
    let time_range = match &result.time_span {
        Some((first, last)) => [Some(format_timestamp(first)), Some(format_timestamp(last))],
        None => [None, None],
    };

    JsonReport {
        version: SCHEMA_VERSION.to_string(),
        session_id: result.session_id.clone(),
        total_entries: result.total_events,
        time_range,
        functions_called: result.functions.iter().cloned().collect(),
        anomalies: result.anomalies.clone(),
        execution_trace: result.calls.iter().map(TraceEntry::from).collect(),
        state_change_count: result.state_changes.len(),
        orphan_state_count: result.orphan_states.len(),
        dangling_exit_count: result.dangling_exits.len(),
    }
}

/// Render the JSON report (pretty-printed)
///
/// # Errors
/// * `OutputError::SerializationFailed` - JSON serialization error
pub fn render_json(result: &AnalysisResult) -> Result<String, OutputError> {
    let report = to_report(result);
    let json = serde_json::to_string_pretty(&report).map_err(OutputError::SerializationFailed)?;
    debug!("JSON report rendered ({} bytes)", json.len());
    Ok(json)
}
