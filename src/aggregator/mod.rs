//! Reconstruction of call history and anomaly detection.
//!
//! This module transforms parsed trace events into:
//! - Call frames (stack-correlated ENTRY/EXIT pairs)
//! - Anomalies (unclosed, slow, errors, null returns, dangling exits)
//! - The complete `AnalysisResult` consumed by the report renderers

pub mod analysis;
pub mod anomalies;
pub mod call_tree;

// Re-export main types and functions
pub use analysis::{analyze_events, analyze_logs, AnalysisResult};
pub use anomalies::{
    check_dangling_exits, check_logged_errors, check_null_returns, check_slow_calls,
    check_unclosed_calls, detect_anomalies, slow_call_threshold, Anomaly, AnomalyConfig,
    AnomalyKind, Severity,
};
pub use call_tree::{reconstruct, CallFrame, Reconstruction};
