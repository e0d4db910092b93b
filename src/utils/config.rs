//! Configuration and constants shared by the instrumenter and the analyzer.

/// Literal prefix of every trace line
pub const LOG_MARKER: &str = "[DEBUG:";

/// Suffix appended to a source path to form its backup path
pub const BACKUP_SUFFIX: &str = ".debug_backup";

/// Length of auto-generated session ids (lowercase hex characters)
pub const SESSION_ID_LEN: usize = 8;

/// Current JSON report schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

// A completed call is slow when it exceeds this multiple of the mean duration
pub const DEFAULT_SLOW_CALL_FACTOR: f64 = 10.0;

/// Maximum number of state changes listed in the markdown report
pub const STATE_CHANGE_DISPLAY_LIMIT: usize = 20;

/// Hint printed when no trace line could be parsed
pub const EXPECTED_FORMAT_HINT: &str =
    "[DEBUG:<session-id>] <timestamp> | <location> | <event-type> | <data>";

// Extensions routed to each instrumentation backend
pub const PYTHON_EXTENSIONS: &[&str] = &["py"];
pub const JAVASCRIPT_EXTENSIONS: &[&str] = &["js", "jsx", "ts", "tsx", "mjs", "cjs"];
