//! Utility modules for configuration, error handling, and session ids.

pub mod config;
pub mod error;
pub mod session;

// Re-export commonly used error types for convenience
pub use error::{InstrumentError, OutputError};
