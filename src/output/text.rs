//! Plain-text summary.

use super::{ReportConfig, SeverityCounts};
use crate::aggregator::AnalysisResult;

/// Render a compact multi-line summary
pub fn render_text(result: &AnalysisResult, config: &ReportConfig) -> String {
    let mut out: Vec<String> = Vec::new();

    out.push(format!("Debug Log Analysis - Session: {}", result.session_id));
    out.push(format!("Total entries: {}", result.total_events));
    out.push(format!(
        "Functions: {}",
        result.functions.iter().cloned().collect::<Vec<_>>().join(", ")
    ));

    if config.emphasize_anomalies {
        let counts = SeverityCounts::tally(&result.anomalies);
        out.push(format!("Anomalies: {} ({})", counts.total(), counts));
    }

    if !result.anomalies.is_empty() {
        out.push("\nAnomalies:".to_string());
        for anomaly in &result.anomalies {
            out.push(format!(
                "  [{}] {}: {}",
                anomaly.severity.as_str().to_uppercase(),
                anomaly.kind,
                anomaly.message
            ));
        }
    }

    if config.show_trace && !result.calls.is_empty() {
        out.push("\nCalls:".to_string());
        for call in &result.calls {
            let duration = call
                .duration_ms()
                .map(|ms| format!("{:.2}ms", ms))
                .unwrap_or_else(|| "no exit".to_string());
            out.push(format!("  {} ({})", call.name(), duration));
        }
    }

    out.join("\n")
}
