//! Instrument command implementation.
//!
//! The instrument command either:
//! 1. Resolves the session id
//! 2. Instruments the file (in place with a backup, or to another file)
//! 3. Prints what was instrumented and how to restore
//!
//! or, with `--restore`, puts the backup back over the file.

use crate::instrument::{instrument_file, restore_backup, InstrumentOptions, InstrumentReport};
use crate::utils::session::{resolve_session_id, validate_session_id};
use anyhow::{Context, Result};
use log::{info, warn};
use std::path::PathBuf;

/// Arguments for the instrument command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone, Default)]
pub struct InstrumentArgs {
    /// Source file to instrument or restore
    pub file: PathBuf,

    /// Only instrument these functions (empty = all)
    pub functions: Vec<String>,

    /// Insert STATE capture before these 1-based lines
    pub lines: Vec<usize>,

    /// Restore the backup instead of instrumenting
    pub restore: bool,

    /// Custom session id (generated when absent)
    pub session_id: Option<String>,

    /// Write instrumented code here instead of in place
    pub output_file: Option<PathBuf>,
}

/// Validate instrument arguments
///
/// **Public** - can be called before execute_instrument for early validation
pub fn validate_args(args: &InstrumentArgs) -> Result<()> {
    if args.file.as_os_str().is_empty() {
        anyhow::bail!("Source file path cannot be empty");
    }

    if args.lines.contains(&0) {
        anyhow::bail!("Line numbers start at 1");
    }

    if args.functions.iter().any(|f| f.trim().is_empty()) {
        anyhow::bail!("Function names cannot be empty");
    }

    if let Some(id) = &args.session_id {
        validate_session_id(id)?;
    }

    if args.restore && args.output_file.is_some() {
        anyhow::bail!("--restore cannot be combined with --output-file");
    }

    Ok(())
}

/// Execute the instrument command
///
/// **Public** - main entry point called from main.rs
///
/// # Returns
/// The instrumentation report (printing is done here)
pub fn execute_instrument(args: InstrumentArgs) -> Result<InstrumentReport> {
    let session_id = resolve_session_id(args.session_id.as_deref())?;
    info!("Session id: {}", session_id);

    let options = InstrumentOptions::new(session_id)
        .with_functions(args.functions.iter().map(|f| f.trim().to_string()))
        .with_lines(args.lines.iter().copied());

    let report = instrument_file(&args.file, &options, args.output_file.as_deref())
        .with_context(|| format!("Failed to instrument {}", args.file.display()))?;

    print_report(&report);

    Ok(report)
}

/// Execute `instrument --restore`
///
/// **Public** - called from main.rs when `--restore` is set
pub fn execute_restore(args: &InstrumentArgs) -> Result<()> {
    if !args.functions.is_empty() || !args.lines.is_empty() || args.session_id.is_some() {
        warn!("--restore ignores --functions, --lines and --session-id");
    }

    restore_backup(&args.file)
        .with_context(|| format!("Failed to restore {}", args.file.display()))?;

    println!("Restored original file: {}", args.file.display());
    Ok(())
}

/// **Private** - summary printed after a successful run
fn print_report(report: &InstrumentReport) {
    let result = &report.result;

    if let Some(reason) = &result.fallback {
        println!("Warning: structured parse failed ({})", reason);
        println!("Fell back to pattern-based instrumentation");
    }

    println!("Successfully instrumented {}", report.source_path.display());
    println!("  Language: {}", result.language);
    println!("  Session ID: {}", report.session_id);
    println!("  Strategy: {}", result.strategy);

    match &report.backup_path {
        Some(backup) => println!("  Backup: {}", backup.display()),
        None => println!("  Output: {}", report.output_path.display()),
    }

    if !result.functions.is_empty() {
        println!("  Functions: {}", result.functions.join(", "));
    }

    if !result.lines.is_empty() {
        let lines: Vec<String> = result.lines.iter().map(|l| l.to_string()).collect();
        println!("  Lines: {}", lines.join(", "));
    }

    if report.backup_path.is_some() {
        println!(
            "\nTo restore original: debug-trace instrument {} --restore",
            report.source_path.display()
        );
    }
}
