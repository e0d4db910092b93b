//! Analyze command implementation.
//!
//! The analyze command:
//! 1. Reads the captured log (file or stdin)
//! 2. Parses trace events, optionally for one session
//! 3. Reconstructs calls and detects anomalies
//! 4. Renders the report to stdout or a file

use crate::aggregator::{analyze_events, AnalysisResult, AnomalyConfig};
use crate::output::{render_report, write_report, ReportConfig};
use crate::parser::read_events;
use crate::utils::config::EXPECTED_FORMAT_HINT;
use crate::utils::session::validate_session_filter;
use anyhow::{Context, Result};
use log::{debug, info};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::time::Instant;

/// Arguments for the analyze command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone, Default)]
pub struct AnalyzeArgs {
    /// Log file; stdin when absent
    pub file: Option<PathBuf>,

    /// Read from stdin even if a file is named
    pub stdin: bool,

    /// Only analyze this session
    pub session_id: Option<String>,

    /// Rendering options
    pub report: ReportConfig,

    /// Anomaly check tunables
    pub anomaly_config: AnomalyConfig,

    /// Write the report here instead of stdout
    pub output: Option<PathBuf>,
}

/// Validate analyze arguments
///
/// **Public** - can be called before execute_analyze for early validation
pub fn validate_args(args: &AnalyzeArgs) -> Result<()> {
    if let Some(id) = &args.session_id {
        validate_session_filter(id)?;
    }

    let factor = args.anomaly_config.slow_call_factor;
    if factor.is_nan() || factor <= 0.0 {
        anyhow::bail!("Slow-call factor must be positive");
    }

    if let Some(file) = &args.file {
        if !args.stdin && !file.is_file() {
            anyhow::bail!("File not found: {}", file.display());
        }
    }

    Ok(())
}

/// Execute the analyze command
///
/// **Public** - main entry point called from main.rs
///
/// # Errors
/// * Input cannot be read
/// * No trace line parsed (the expected format is included in the error)
/// * Report cannot be written
pub fn execute_analyze(args: AnalyzeArgs) -> Result<AnalysisResult> {
    let start_time = Instant::now();
    let filter = args.session_id.as_deref();

    info!("Step 1/3: Reading trace events...");
    let events = match (&args.file, args.stdin) {
        (Some(path), false) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            read_events(file, filter)
        }
        _ => read_events(io::stdin().lock(), filter),
    }
    .context("Failed to read log input")?;

    if events.is_empty() {
        anyhow::bail!(
            "No debug log entries found in input.\nExpected format: {}",
            EXPECTED_FORMAT_HINT
        );
    }

    info!("Step 2/3: Analyzing {} events...", events.len());
    let result = analyze_events(events, filter, &args.anomaly_config);

    info!("Step 3/3: Rendering {:?} report...", args.report.format);
    let rendered = render_report(&result, &args.report).context("Failed to render report")?;

    match &args.output {
        Some(path) => {
            write_report(&rendered, path).context("Failed to write report")?;
            info!("✓ Report written to: {}", path.display());
        }
        None => println!("{}", rendered),
    }

    debug!(
        "Analysis completed in {:.2}s",
        start_time.elapsed().as_secs_f64()
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_validate_args_defaults() {
        assert!(validate_args(&AnalyzeArgs::default()).is_ok());
    }

    #[test]
    fn test_validate_args_missing_file() {
        let args = AnalyzeArgs {
            file: Some(PathBuf::from("/definitely/not/here.log")),
            ..Default::default()
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_session_filter() {
        let dotted = AnalyzeArgs {
            session_id: Some("run.1".to_string()),
            ..Default::default()
        };
        assert!(validate_args(&dotted).is_ok());

        let piped = AnalyzeArgs {
            session_id: Some("a|b".to_string()),
            ..Default::default()
        };
        assert!(validate_args(&piped).is_err());
    }

    #[test]
    fn test_validate_args_bad_factor() {
        let args = AnalyzeArgs {
            anomaly_config: AnomalyConfig::default().with_slow_call_factor(0.0),
            ..Default::default()
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_empty_log_fails_with_hint() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "plain output only").unwrap();

        let args = AnalyzeArgs {
            file: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let err = execute_analyze(args).unwrap_err();
        assert!(err.to_string().contains("[DEBUG:<session-id>]"));
    }
}
