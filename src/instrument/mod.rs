//! Source instrumentation.
//!
//! Turns a Python or JavaScript source into one that prints trace lines
//! while it runs. Two backends exist:
//!
//! - structured (tree-sitter, Python only)
//! - pattern-based (line regexes, every language, and the Python fallback)
//!
//! Explicit-line STATE insertion runs first, then function instrumentation.
//! File handling (backup, restore, atomic writes) lives in `file`.

pub mod emit;
pub mod file;
pub mod language;
pub mod lines;
pub mod patterns;
pub mod structured;

pub use file::{
    backup_path_for, create_backup, has_backup, instrument_file, restore_backup, write_atomic,
    InstrumentReport,
};
pub use language::Language;

use log::{debug, info, warn};
use std::collections::BTreeSet;
use std::fmt;
use tree_sitter::Tree;

/// What to instrument and how to tag it
#[derive(Debug, Clone)]
pub struct InstrumentOptions {
    pub session_id: String,
    /// Only these functions get ENTRY/EXIT statements; `None` means all
    pub functions: Option<BTreeSet<String>>,
    /// 1-based line numbers that receive a STATE statement
    pub lines: Vec<usize>,
}

impl InstrumentOptions {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            functions: None,
            lines: Vec::new(),
        }
    }

    pub fn with_functions<I, S>(mut self, functions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = functions.into_iter().map(Into::into).collect();
        self.functions = if set.is_empty() { None } else { Some(set) };
        self
    }

    pub fn with_lines(mut self, lines: impl IntoIterator<Item = usize>) -> Self {
        self.lines = lines.into_iter().collect();
        self
    }

    /// Whether `name` passes the function filter
    pub fn wants(&self, name: &str) -> bool {
        self.functions
            .as_ref()
            .map_or(true, |set| set.contains(name))
    }
}

/// Backend actually used for function instrumentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Structured,
    PatternBased,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Structured => f.write_str("structured"),
            StrategyKind::PatternBased => f.write_str("pattern-based"),
        }
    }
}

/// Backend chosen for one source, decided by attempting the parse
#[derive(Debug)]
pub enum Strategy {
    /// Parsed successfully; the tree drives the rewrite
    Structured(Tree),
    /// Regex rewrite; `fallback` holds the parse failure when the
    /// structured backend was tried first
    PatternBased { fallback: Option<String> },
}

impl Strategy {
    /// Pick the backend for `source`
    ///
    /// Python is parsed with tree-sitter and falls back to patterns on any
    /// parse failure. JavaScript always uses patterns.
    pub fn select(language: Language, source: &str) -> Self {
        match language {
            Language::Python => match structured::parse_python(source) {
                Ok(tree) => Strategy::Structured(tree),
                Err(reason) => Strategy::PatternBased {
                    fallback: Some(reason),
                },
            },
            Language::JavaScript => Strategy::PatternBased { fallback: None },
        }
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::Structured(_) => StrategyKind::Structured,
            Strategy::PatternBased { .. } => StrategyKind::PatternBased,
        }
    }
}

/// Result of instrumenting one source text
#[derive(Debug, Clone)]
pub struct Instrumented {
    pub code: String,
    pub language: Language,
    /// Functions that received ENTRY statements, in source order
    pub functions: Vec<String>,
    /// Lines that received STATE statements (original numbering)
    pub lines: Vec<usize>,
    pub strategy: StrategyKind,
    /// Why the structured backend was abandoned, if it was
    pub fallback: Option<String>,
}

impl Instrumented {
    pub fn fell_back(&self) -> bool {
        self.fallback.is_some()
    }
}

/// Instrument source text in memory
///
/// **Public** - main entry point for instrumentation
///
/// # Arguments
/// * `source` - Original source text
/// * `language` - Target language
/// * `options` - Session id, function filter and STATE lines
///
/// # Returns
/// Instrumented text with the functions, lines and strategy used
pub fn instrument_source(
    source: &str,
    language: Language,
    options: &InstrumentOptions,
) -> Instrumented {
    let session_id = options.session_id.as_str();

    // Line insertion first so requested numbers refer to the original text
    let inserted = lines::insert_state_lines(source, language, &options.lines, session_id);
    debug!("Inserted STATE before {} lines", inserted.applied.len());

    let strategy = Strategy::select(language, &inserted.code);
    let kind = strategy.kind();
    info!("Instrumenting {} source ({} strategy)", language, kind);

    let wants = |name: &str| options.wants(name);
    let line_of = |row: usize| inserted.original_line(row);

    let (code, functions, fallback) = match strategy {
        Strategy::Structured(tree) => {
            let rewritten =
                structured::rewrite(&tree, &inserted.code, session_id, wants, line_of);
            (rewritten.code, rewritten.functions, None)
        }
        Strategy::PatternBased { fallback } => {
            if let Some(reason) = &fallback {
                warn!(
                    "Structured parse failed ({}); falling back to pattern-based instrumentation",
                    reason
                );
            }
            let rewritten =
                patterns::rewrite(&inserted.code, language, session_id, wants, line_of);
            (rewritten.code, rewritten.functions, fallback)
        }
    };

    if let Some(filter) = &options.functions {
        for name in filter.iter().filter(|n| !functions.contains(*n)) {
            warn!("Function '{}' not found in source", name);
        }
    }

    Instrumented {
        code,
        language,
        functions,
        lines: inserted.applied,
        strategy: kind,
        fallback,
    }
}
