//! Report rendering and writing.
//!
//! An `AnalysisResult` can be rendered as:
//! - markdown (default, human-oriented)
//! - JSON (stable schema for tooling)
//! - plain text (compact summary)

pub mod json;
pub mod markdown;
pub mod text;
pub mod writer;

pub use json::{render_json, to_report, JsonReport, TraceEntry};
pub use markdown::render_markdown;
pub use text::render_text;
pub use writer::write_report;

use crate::aggregator::{AnalysisResult, Anomaly, Severity};
use crate::utils::config::STATE_CHANGE_DISPLAY_LIMIT;
use crate::utils::error::OutputError;
use clap::ValueEnum;

/// Report format selectable on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    #[default]
    Markdown,
}

/// Report rendering options
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub format: OutputFormat,
    /// Include the per-call execution trace
    pub show_trace: bool,
    /// Move anomalies first and add severity counts
    pub emphasize_anomalies: bool,
    /// Maximum number of state changes listed in markdown
    pub state_limit: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            show_trace: false,
            emphasize_anomalies: false,
            state_limit: STATE_CHANGE_DISPLAY_LIMIT,
        }
    }
}

impl ReportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_trace(mut self, show_trace: bool) -> Self {
        self.show_trace = show_trace;
        self
    }

    pub fn with_anomaly_emphasis(mut self, emphasize: bool) -> Self {
        self.emphasize_anomalies = emphasize;
        self
    }

    pub fn with_state_limit(mut self, limit: usize) -> Self {
        self.state_limit = limit;
        self
    }
}

/// Render a result in the configured format
///
/// **Public** - main entry point for report rendering
pub fn render_report(result: &AnalysisResult, config: &ReportConfig) -> Result<String, OutputError> {
    match config.format {
        OutputFormat::Markdown => Ok(render_markdown(result, config)),
        OutputFormat::Json => render_json(result),
        OutputFormat::Text => Ok(render_text(result, config)),
    }
}

/// Anomaly counts by severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeverityCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl SeverityCounts {
    pub fn tally(anomalies: &[Anomaly]) -> Self {
        anomalies
            .iter()
            .fold(Self::default(), |mut counts, anomaly| {
                match anomaly.severity {
                    Severity::High => counts.high += 1,
                    Severity::Medium => counts.medium += 1,
                    Severity::Low => counts.low += 1,
                }
                counts
            })
    }

    pub fn total(&self) -> usize {
        self.high + self.medium + self.low
    }
}

impl std::fmt::Display for SeverityCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} high, {} medium, {} low",
            self.high, self.medium, self.low
        )
    }
}
