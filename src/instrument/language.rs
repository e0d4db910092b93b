//! Target language detection.

use crate::utils::config::{JAVASCRIPT_EXTENSIONS, PYTHON_EXTENSIONS};
use std::fmt;
use std::path::Path;

/// Language families the instrumenter understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    /// Structured backend (tree-sitter), pattern fallback
    Python,
    /// JavaScript and TypeScript, pattern backend only
    JavaScript,
}

impl Language {
    /// Detect from the file extension (case-insensitive)
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        Self::from_extension(&ext)
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.');
        if PYTHON_EXTENSIONS.contains(&ext) {
            Some(Language::Python)
        } else if JAVASCRIPT_EXTENSIONS.contains(&ext) {
            Some(Language::JavaScript)
        } else {
            None
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
        }
    }

    /// One level of indentation used when the source gives no hint
    pub fn indent_unit(&self) -> &'static str {
        match self {
            Language::Python => "    ",
            Language::JavaScript => "  ",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
