//! Debug Trace Studio
//!
//! Debug-mode tracing for Python and JavaScript sources. Source files are
//! instrumented so that every traced function prints structured lines
//! while the program runs; the captured output is then analyzed into a
//! reconstructed call history with anomaly detection.
//!
//! This crate provides the core implementation for the `debug-trace`
//! CLI tool.
//!
//! ## Getting Started
//!
//! ```bash
//! debug-trace instrument app.py --functions checkout,total
//! python app.py 2>&1 | tee run.log
//! debug-trace analyze run.log --trace
//! debug-trace instrument app.py --restore
//! ```

pub mod aggregator;
pub mod commands;
pub mod instrument;
pub mod output;
pub mod parser;
pub mod utils;
