//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while instrumenting or restoring a source file
#[derive(Error, Debug)]
pub enum InstrumentError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Unsupported file type: {}", .0.display())]
    UnsupportedLanguage(PathBuf),

    #[error("No backup found for: {}", .0.display())]
    BackupNotFound(PathBuf),

    #[error("Invalid session id '{0}': use ASCII letters, digits, '_' or '-'")]
    InvalidSessionId(String),

    #[error("Invalid session filter '{0}': must be non-empty without '|' or ']'")]
    InvalidSessionFilter(String),

    #[error("Session id generation failed: {0}")]
    SessionIdUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur during report output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}
