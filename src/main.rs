//! Debug Trace CLI
//!
//! Instruments Python/JavaScript sources with trace statements and
//! analyzes the captured trace logs.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use debug_trace_studio::aggregator::AnomalyConfig;
use debug_trace_studio::commands::{
    analyze, execute_analyze, execute_instrument, execute_restore, instrument, AnalyzeArgs,
    InstrumentArgs,
};
use debug_trace_studio::output::{OutputFormat, ReportConfig};
use debug_trace_studio::utils::config::DEFAULT_SLOW_CALL_FACTOR;

/// Debug Trace - runtime tracing for debugging sessions
#[derive(Parser, Debug)]
#[command(name = "debug-trace")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Instrument a source file (or restore it with --restore)
    Instrument {
        /// Source file to instrument
        file: PathBuf,

        /// Comma-separated function names to instrument (default: all)
        #[arg(short, long, value_delimiter = ',')]
        functions: Vec<String>,

        /// Comma-separated line numbers to capture state before
        #[arg(short, long, value_delimiter = ',')]
        lines: Vec<usize>,

        /// Restore the original file from its backup
        #[arg(short, long)]
        restore: bool,

        /// Custom session id (default: random 8 hex characters)
        #[arg(short, long, env = "DEBUG_TRACE_SESSION")]
        session_id: Option<String>,

        /// Write instrumented code to this file instead of in place
        #[arg(short, long)]
        output_file: Option<PathBuf>,
    },

    /// Analyze captured trace logs
    Analyze {
        /// Log file to analyze (stdin when omitted)
        file: Option<PathBuf>,

        /// Read logs from stdin
        #[arg(long)]
        stdin: bool,

        /// Only analyze this session
        #[arg(short, long)]
        session_id: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Markdown)]
        format: OutputFormat,

        /// Show the detailed execution trace
        #[arg(short, long)]
        trace: bool,

        /// Emphasize anomalies (moved first, with severity counts)
        #[arg(short, long)]
        anomalies: bool,

        /// Flag calls slower than this multiple of the mean duration
        #[arg(long, default_value_t = DEFAULT_SLOW_CALL_FACTOR)]
        slow_factor: f64,

        /// Write the report to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    // Execute command
    match cli.command {
        Commands::Instrument {
            file,
            functions,
            lines,
            restore,
            session_id,
            output_file,
        } => {
            let args = InstrumentArgs {
                file,
                functions,
                lines,
                restore,
                session_id,
                output_file,
            };

            // Validate args first
            instrument::validate_args(&args)?;

            if args.restore {
                execute_restore(&args)?;
            } else {
                execute_instrument(args)?;
            }
        }

        Commands::Analyze {
            file,
            stdin,
            session_id,
            format,
            trace,
            anomalies,
            slow_factor,
            output,
        } => {
            let report = ReportConfig::new()
                .with_format(format)
                .with_trace(trace)
                .with_anomaly_emphasis(anomalies);

            let args = AnalyzeArgs {
                file,
                stdin,
                session_id,
                report,
                anomaly_config: AnomalyConfig::new().with_slow_call_factor(slow_factor),
                output,
            };

            analyze::validate_args(&args)?;
            execute_analyze(args)?;
        }
    }

    Ok(())
}
