//! Markdown report.

use super::{ReportConfig, SeverityCounts};
use crate::aggregator::{AnalysisResult, Anomaly, CallFrame, Severity};
use crate::parser::{format_timestamp, PayloadValue};
use serde_json::Value;

fn severity_icon(severity: Severity) -> &'static str {
    match severity {
        Severity::High => "🔴",
        Severity::Medium => "🟡",
        Severity::Low => "🟢",
    }
}

/// Render the markdown report
///
/// **Public** - default report format
///
/// Sections: header, functions, anomalies, optional execution trace, and
/// the first `state_limit` state changes. With anomaly emphasis the
/// anomaly section directly follows the header and carries severity counts.
pub fn render_markdown(result: &AnalysisResult, config: &ReportConfig) -> String {
    let mut out: Vec<String> = Vec::new();

    out.push("# Debug Log Analysis\n".to_string());
    out.push(format!("**Session ID:** `{}`\n", result.session_id));
    out.push(format!("**Total Log Entries:** {}\n", result.total_events));

    if let Some((first, last)) = &result.time_span {
        out.push(format!(
            "**Time Range:** {} to {}\n",
            format_timestamp(first),
            format_timestamp(last)
        ));
    }

    if config.emphasize_anomalies {
        push_anomalies(&mut out, &result.anomalies, true);
    }

    if !result.functions.is_empty() {
        out.push("\n## Functions Called\n".to_string());
        out.extend(result.functions.iter().map(|f| format!("- `{}`", f)));
    }

    if !config.emphasize_anomalies {
        push_anomalies(&mut out, &result.anomalies, false);
    }

    if config.show_trace && !result.calls.is_empty() {
        out.push("\n## Execution Trace\n".to_string());
        out.push("```".to_string());
        for call in &result.calls {
            push_call(&mut out, call);
        }
        out.push("```".to_string());
    }

    if !result.state_changes.is_empty() {
        out.push("\n## State Changes\n".to_string());
        out.push("```".to_string());
        for state in result.state_changes.iter().take(config.state_limit) {
            out.push(format!(
                "[{}] {}: {}",
                state.timestamp.format("%H:%M:%S%.3f"),
                state.location,
                state.payload.to_json()
            ));
        }
        if result.state_changes.len() > config.state_limit {
            out.push(format!(
                "... and {} more state changes",
                result.state_changes.len() - config.state_limit
            ));
        }
        out.push("```".to_string());
    }

    out.join("\n")
}

/// **Private** - anomaly section, with counts when emphasized
fn push_anomalies(out: &mut Vec<String>, anomalies: &[Anomaly], emphasized: bool) {
    if anomalies.is_empty() {
        if emphasized {
            out.push("\n## Anomalies Detected\n".to_string());
            out.push("No anomalies detected.".to_string());
        }
        return;
    }

    out.push("\n## Anomalies Detected\n".to_string());
    if emphasized {
        let counts = SeverityCounts::tally(anomalies);
        out.push(format!("**{} anomalies:** {}\n", counts.total(), counts));
    }

    for anomaly in anomalies {
        out.push(format!(
            "{} **{}** at `{}`",
            severity_icon(anomaly.severity),
            anomaly.kind,
            anomaly.location
        ));
        out.push(format!("   {}\n", anomaly.message));
    }
}

/// **Private** - one call of the execution trace block
fn push_call(out: &mut Vec<String>, call: &CallFrame) {
    let status = if call.is_closed() { "✓" } else { "✗ (no exit)" };
    let duration = call
        .duration_ms()
        .map(|ms| format!(" ({:.2}ms)", ms))
        .unwrap_or_default();
    out.push(format!("{}{} {}", call.name(), duration, status));

    if let Some(args) = call.args().filter(|a| !is_empty_value(a)) {
        out.push(format!("  → args: {}", args.to_json()));
    }

    for state in call.states() {
        out.push(format!("  | state: {}", state.payload.to_json()));
    }

    if let Some(ret) = call.return_value().filter(|r| r.as_json() != Some(&Value::Null)) {
        out.push(format!("  ← return: {}", ret.to_json()));
    }
}

fn is_empty_value(value: &PayloadValue) -> bool {
    match value.as_json() {
        Some(Value::Null) => true,
        Some(Value::Object(map)) => map.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        _ => false,
    }
}
