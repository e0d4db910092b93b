//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the library components and own all user-facing
//! printing; errors propagate as `anyhow::Error` with context.

pub mod analyze;
pub mod instrument;

// Re-export main command functions
pub use analyze::{execute_analyze, AnalyzeArgs};
pub use instrument::{execute_instrument, execute_restore, InstrumentArgs};
