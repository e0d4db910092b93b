//! Heuristic anomaly checks over a reconstructed trace.
//!
//! Checks are independent: a single call may be reported by several of
//! them and nothing is deduplicated. A check with no applicable data is
//! skipped.

use super::call_tree::{CallFrame, Reconstruction};
use crate::parser::{EventKind, TraceEvent};
use crate::utils::config::DEFAULT_SLOW_CALL_FACTOR;
use log::debug;
use serde::Serialize;
use std::fmt;

/// Anomaly category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyKind {
    /// Entered but never exited
    UnclosedCall,
    /// Duration far above the mean of completed calls
    SlowCall,
    /// ERROR event in the log
    LoggedError,
    /// EXIT without a meaningful return value
    NullReturn,
    /// EXIT with no open frame of that name
    DanglingExit,
}

impl AnomalyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyKind::UnclosedCall => "UNCLOSED_CALL",
            AnomalyKind::SlowCall => "SLOW_CALL",
            AnomalyKind::LoggedError => "LOGGED_ERROR",
            AnomalyKind::NullReturn => "NULL_RETURN",
            AnomalyKind::DanglingExit => "DANGLING_EXIT",
        }
    }
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected irregularity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
    #[serde(rename = "type")]
    pub kind: AnomalyKind,

    pub severity: Severity,

    /// `function[:line]` of the offending event
    pub location: String,

    pub message: String,

    /// Numeric evidence (milliseconds for SLOW_CALL)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<f64>,
}

impl Anomaly {
    fn new(
        kind: AnomalyKind,
        severity: Severity,
        location: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            severity,
            location: location.into(),
            message: message.into(),
            evidence: None,
        }
    }

    fn with_evidence(mut self, value: f64) -> Self {
        self.evidence = Some(value);
        self
    }
}

/// Tunables for the anomaly checks
#[derive(Debug, Clone)]
pub struct AnomalyConfig {
    /// A call is slow when its duration exceeds `factor * mean`
    pub slow_call_factor: f64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            slow_call_factor: DEFAULT_SLOW_CALL_FACTOR,
        }
    }
}

impl AnomalyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_slow_call_factor(mut self, factor: f64) -> Self {
        self.slow_call_factor = factor;
        self
    }
}

/// Run every check
///
/// **Public** - main entry point for anomaly detection
///
/// # Arguments
/// * `events` - Parsed (and session-filtered) events
/// * `trace` - Reconstruction built from the same events
/// * `config` - Check tunables
///
/// # Returns
/// Anomalies grouped by check, in check order
pub fn detect_anomalies(
    events: &[TraceEvent],
    trace: &Reconstruction,
    config: &AnomalyConfig,
) -> Vec<Anomaly> {
    let mut anomalies = Vec::new();

    anomalies.extend(check_unclosed_calls(&trace.calls));
    anomalies.extend(check_slow_calls(&trace.calls, config.slow_call_factor));
    anomalies.extend(check_logged_errors(events));
    anomalies.extend(check_null_returns(events));
    anomalies.extend(check_dangling_exits(&trace.dangling_exits));

    debug!("Detected {} anomalies", anomalies.len());

    anomalies
}

/// One high-severity anomaly per frame without an EXIT
pub fn check_unclosed_calls(calls: &[CallFrame]) -> Vec<Anomaly> {
    calls
        .iter()
        .filter(|call| !call.is_closed())
        .map(|call| {
            Anomaly::new(
                AnomalyKind::UnclosedCall,
                Severity::High,
                call.entry().location.to_string(),
                format!("Function {} was entered but never exited", call.name()),
            )
        })
        .collect()
}

/// Mean duration and slow-call threshold for a set of durations
///
/// Returns `None` when there are no durations.
pub fn slow_call_threshold(durations_ms: &[f64], factor: f64) -> Option<(f64, f64)> {
    if durations_ms.is_empty() {
        return None;
    }
    let mean = durations_ms.iter().sum::<f64>() / durations_ms.len() as f64;
    Some((mean, mean * factor))
}

/// Medium-severity anomaly for every completed call above the threshold
pub fn check_slow_calls(calls: &[CallFrame], factor: f64) -> Vec<Anomaly> {
    let durations: Vec<f64> = calls.iter().filter_map(|c| c.duration_ms()).collect();

    let Some((mean, threshold)) = slow_call_threshold(&durations, factor) else {
        debug!("No completed calls, skipping slow-call check");
        return Vec::new();
    };

    debug!("Slow-call threshold {:.2}ms (mean {:.2}ms)", threshold, mean);

    calls
        .iter()
        .filter_map(|call| {
            let duration = call.duration_ms()?;
            (duration > threshold).then(|| {
                Anomaly::new(
                    AnomalyKind::SlowCall,
                    Severity::Medium,
                    call.entry().location.to_string(),
                    format!(
                        "Function {} took {:.2}ms (avg: {:.2}ms)",
                        call.name(),
                        duration,
                        mean
                    ),
                )
                .with_evidence(duration)
            })
        })
        .collect()
}

/// One high-severity anomaly per ERROR event
pub fn check_logged_errors(events: &[TraceEvent]) -> Vec<Anomaly> {
    events
        .iter()
        .filter(|e| e.kind == EventKind::Error)
        .map(|e| {
            Anomaly::new(
                AnomalyKind::LoggedError,
                Severity::High,
                e.location.to_string(),
                format!("Error at {}: {}", e.location, e.payload.to_json()),
            )
        })
        .collect()
}

/// One low-severity anomaly per EXIT whose `return` is absent or null-like
pub fn check_null_returns(events: &[TraceEvent]) -> Vec<Anomaly> {
    events
        .iter()
        .filter(|e| e.kind == EventKind::Exit)
        .filter(|e| {
            e.payload
                .get("return")
                .map_or(true, |value| value.is_null_like())
        })
        .map(|e| {
            Anomaly::new(
                AnomalyKind::NullReturn,
                Severity::Low,
                e.location.to_string(),
                format!("Function at {} returned None/null", e.location),
            )
        })
        .collect()
}

/// One low-severity anomaly per EXIT that matched no open frame
pub fn check_dangling_exits(dangling: &[TraceEvent]) -> Vec<Anomaly> {
    dangling
        .iter()
        .map(|e| {
            Anomaly::new(
                AnomalyKind::DanglingExit,
                Severity::Low,
                e.location.to_string(),
                format!(
                    "Function {} exited without a matching entry",
                    e.function_name()
                ),
            )
        })
        .collect()
}
