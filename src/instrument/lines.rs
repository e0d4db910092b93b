//! Explicit-line STATE insertion.
//!
//! A STATE statement is inserted immediately before each requested source
//! line, at that line's indentation. Insertions run from the highest line
//! number down so the remaining line numbers still refer to the original
//! text. The function filter does not apply here.

use super::emit;
use super::language::Language;
use super::patterns::{collect_bindings, leading_whitespace};
use log::debug;
use std::collections::BTreeSet;

/// Result of STATE insertion
#[derive(Debug, Clone)]
pub struct LineInsertion {
    pub code: String,
    /// Line numbers that received a STATE statement (ascending)
    pub applied: Vec<usize>,
}

impl LineInsertion {
    /// Map a 1-based line of `code` back to the original numbering
    ///
    /// The STATE statement for the i-th applied line (0-based) sits at
    /// `applied[i] + i`; every line after it shifts down by one.
    pub fn original_line(&self, row: usize) -> usize {
        let shifted = self
            .applied
            .iter()
            .enumerate()
            .filter(|&(i, &line)| line + i <= row)
            .count();
        row - shifted
    }
}

/// Insert STATE statements before the given 1-based line numbers
///
/// Out-of-range line numbers are ignored and duplicates collapse.
pub fn insert_state_lines(
    source: &str,
    language: Language,
    targets: &[usize],
    session_id: &str,
) -> LineInsertion {
    let mut lines: Vec<String> = source.split('\n').map(str::to_string).collect();

    // A trailing newline leaves an empty final piece that is not a line
    let line_count = if source.ends_with('\n') {
        lines.len() - 1
    } else {
        lines.len()
    };

    let wanted: BTreeSet<usize> = targets
        .iter()
        .copied()
        .filter(|n| (1..=line_count).contains(n))
        .collect();

    for &line_no in wanted.iter().rev() {
        let index = line_no - 1;
        let indent = target_indent(&lines[index..]);

        let statement = match language {
            Language::Python => emit::python_state(session_id, line_no),
            Language::JavaScript => {
                let bindings = collect_bindings(&lines[..index]);
                emit::javascript_state(session_id, line_no, &bindings)
            }
        };

        lines.insert(index, format!("{}{}", indent, statement));
    }

    let skipped = targets.len() - targets.iter().filter(|n| wanted.contains(*n)).count();
    if skipped > 0 {
        debug!("Ignored {} out-of-range line numbers", skipped);
    }

    LineInsertion {
        code: lines.join("\n"),
        applied: wanted.into_iter().collect(),
    }
}

/// Indentation of the target line, or of the next non-blank line when the
/// target itself is blank
///
/// **Private** - internal helper for insert_state_lines
fn target_indent(from_target: &[String]) -> String {
    from_target
        .iter()
        .find(|l| !l.trim().is_empty())
        .map(|l| leading_whitespace(l).to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PY: &str = "def f(a):\n    b = a + 1\n    return b\n";

    #[test]
    fn test_inserts_before_line_with_indent() {
        let result = insert_state_lines(PY, Language::Python, &[3], "s");
        let lines: Vec<&str> = result.code.split('\n').collect();
        assert_eq!(lines[1], "    b = a + 1");
        assert!(lines[2].starts_with("    print("));
        assert!(lines[2].contains("| line:3 | STATE | locals="));
        assert_eq!(lines[3], "    return b");
        assert_eq!(result.applied, vec![3]);
    }

    #[test]
    fn test_multiple_lines_keep_original_numbering() {
        let result = insert_state_lines(PY, Language::Python, &[3, 2, 2], "s");
        let lines: Vec<&str> = result.code.split('\n').collect();
        assert!(lines[1].contains("| line:2 |"));
        assert_eq!(lines[2], "    b = a + 1");
        assert!(lines[3].contains("| line:3 |"));
        assert_eq!(lines[4], "    return b");
        assert_eq!(result.applied, vec![2, 3]);
    }

    #[test]
    fn test_original_line_skips_inserted_rows() {
        let result = insert_state_lines(PY, Language::Python, &[1, 3], "s");
        let lines: Vec<&str> = result.code.split('\n').collect();
        assert_eq!(lines[1], "def f(a):");
        assert_eq!(result.original_line(2), 1);
        assert_eq!(result.original_line(3), 2);
        assert_eq!(lines[4], "    return b");
        assert_eq!(result.original_line(5), 3);

        let untouched = insert_state_lines(PY, Language::Python, &[], "s");
        assert_eq!(untouched.original_line(2), 2);
    }

    #[test]
    fn test_out_of_range_ignored() {
        let result = insert_state_lines(PY, Language::Python, &[0, 4, 99], "s");
        assert_eq!(result.code, PY);
        assert!(result.applied.is_empty());
    }

    #[test]
    fn test_javascript_bindings_above_line() {
        let js = "function f(x) {\n  const y = x * 2;\n  return y;\n}";
        let result = insert_state_lines(js, Language::JavaScript, &[3], "s");
        let state = result.code.split('\n').nth(2).unwrap();
        assert!(state.starts_with("  console.log("));
        assert!(state.contains("\"y\": (() =>"));
        assert!(state.contains("\"x\": (() =>"));
    }
}
