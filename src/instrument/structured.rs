//! Structured (tree-sitter) backend for Python.
//!
//! The source is parsed into a syntax tree and a visitor walks every
//! `function_definition`. For each selected function it records text edits:
//!
//! - ENTRY statement at the top of the body (after a docstring)
//! - every `return` of that function wrapped so its value is traced
//! - EXIT statement after the last body statement (fall-through path)
//!
//! Edits are applied in one pass; bytes outside the edits are untouched.

use super::emit;
use log::debug;
use std::cmp::Reverse;
use tree_sitter::{Node, Parser, Tree};

/// Parse Python source, treating any syntax error as a failure
///
/// # Returns
/// The tree, or a human-readable reason the parse was rejected
pub fn parse_python(source: &str) -> Result<Tree, String> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| format!("python grammar unavailable: {}", e))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| "parser produced no tree".to_string())?;

    let root = tree.root_node();
    if root.has_error() {
        return Err(match first_error(root) {
            Some(node) => format!("syntax error near line {}", node.start_position().row + 1),
            None => "syntax error".to_string(),
        });
    }

    Ok(tree)
}

/// Depth-first search for the first error or missing node
///
/// **Private** - used to report where a parse failed
fn first_error(root: Node<'_>) -> Option<Node<'_>> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        if node.has_error() {
            let mut cursor = node.walk();
            let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
    }
    None
}

/// Result of a structured rewrite
#[derive(Debug, Clone)]
pub struct StructuredRewrite {
    pub code: String,
    pub functions: Vec<String>,
}

/// One text edit: replace `start..end` with `text` (`start == end` inserts)
#[derive(Debug, Clone)]
struct Edit {
    start: usize,
    end: usize,
    text: String,
    /// Function nesting depth; at equal offsets deeper edits go first
    depth: usize,
}

/// Instrument every selected function of a parsed Python tree
///
/// **Public** - structured backend entry point
///
/// # Arguments
/// * `tree` - Tree returned by `parse_python` for `source`
/// * `source` - The exact text that was parsed
/// * `session_id` - Session id embedded in emitted statements
/// * `wants` - Function filter
/// * `line_of` - Maps a 1-based line of `source` to the line reported in
///   ENTRY/EXIT locations
pub fn rewrite(
    tree: &Tree,
    source: &str,
    session_id: &str,
    wants: impl Fn(&str) -> bool,
    line_of: impl Fn(usize) -> usize,
) -> StructuredRewrite {
    let newline = if source.contains("\r\n") { "\r\n" } else { "\n" };
    let mut visitor = FunctionVisitor {
        source,
        session_id,
        newline,
        wants,
        line_of,
        edits: Vec::new(),
        functions: Vec::new(),
    };

    visitor.visit(tree.root_node(), 0);

    debug!(
        "Structured rewrite: {} functions, {} edits",
        visitor.functions.len(),
        visitor.edits.len()
    );

    StructuredRewrite {
        code: apply_edits(source, visitor.edits),
        functions: visitor.functions,
    }
}

struct FunctionVisitor<'s, F, L> {
    source: &'s str,
    session_id: &'s str,
    newline: &'static str,
    wants: F,
    line_of: L,
    edits: Vec<Edit>,
    functions: Vec<String>,
}

impl<'s, F: Fn(&str) -> bool, L: Fn(usize) -> usize> FunctionVisitor<'s, F, L> {
    fn text(&self, node: Node<'_>) -> &'s str {
        &self.source[node.byte_range()]
    }

    fn visit(&mut self, node: Node<'_>, depth: usize) {
        let child_depth = if node.kind() == "function_definition" {
            self.visit_function(node, depth);
            depth + 1
        } else {
            depth
        };

        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
        for child in children {
            self.visit(child, child_depth);
        }
    }

    fn visit_function(&mut self, node: Node<'_>, depth: usize) {
        let (Some(name_node), Some(params), Some(body)) = (
            node.child_by_field_name("name"),
            node.child_by_field_name("parameters"),
            node.child_by_field_name("body"),
        ) else {
            return;
        };

        let name = self.text(name_node);
        if !(self.wants)(name) {
            return;
        }

        let statements = block_statements(body);
        let (Some(first), Some(last)) = (statements.first().copied(), statements.last().copied())
        else {
            return;
        };

        let def_line = (self.line_of)(node.start_position().row + 1);
        let nl = self.newline;
        let one_line = !self.source[params.end_byte()..body.start_byte()].contains('\n');

        let indent = if one_line {
            format!("{}    ", self.line_indent(node.start_byte()))
        } else {
            self.line_indent(first.start_byte()).to_string()
        };

        let entry = emit::python_entry(
            self.session_id,
            name,
            def_line,
            &parameter_names(params, self.source),
        );

        // ENTRY
        if one_line {
            self.push(
                body.start_byte(),
                body.start_byte(),
                format!("{nl}{indent}{entry}{nl}{indent}"),
                depth,
            );
        } else if is_docstring(first) {
            self.push(
                first.end_byte(),
                first.end_byte(),
                format!("{nl}{indent}{entry}"),
                depth,
            );
        } else {
            self.push(
                first.start_byte(),
                first.start_byte(),
                format!("{entry}{nl}{indent}"),
                depth,
            );
        }

        // return statements
        let mut returns = Vec::new();
        collect_returns(body, &mut returns);
        for ret in returns {
            let ret_line = (self.line_of)(ret.start_position().row + 1);
            let value = {
                let mut cursor = ret.walk();
                let found = ret
                    .named_children(&mut cursor)
                    .find(|c| c.kind() != "comment");
                found
            };
            match value {
                Some(value) => {
                    let wrapped =
                        emit::python_return(self.session_id, name, ret_line, self.text(value));
                    self.push(value.start_byte(), value.end_byte(), wrapped, depth);
                }
                None => {
                    let keyword_end = ret.start_byte() + "return".len();
                    let wrapped = emit::python_return(self.session_id, name, ret_line, "None");
                    self.push(keyword_end, keyword_end, format!(" {}", wrapped), depth);
                }
            }
        }

        // EXIT on fall-through
        let exit = emit::python_exit(self.session_id, name, def_line);
        self.push(last.end_byte(), last.end_byte(), format!("{nl}{indent}{exit}"), depth);

        debug!("Instrumented '{}' (line {}, depth {})", name, def_line, depth);
        self.functions.push(name.to_string());
    }

    /// Leading whitespace of the line containing `offset`
    fn line_indent(&self, offset: usize) -> &'s str {
        let line_start = self.source[..offset].rfind('\n').map_or(0, |i| i + 1);
        let line = &self.source[line_start..offset];
        let trimmed = line.trim_start_matches([' ', '\t']);
        &line[..line.len() - trimmed.len()]
    }

    fn push(&mut self, start: usize, end: usize, text: String, depth: usize) {
        self.edits.push(Edit {
            start,
            end,
            text,
            depth,
        });
    }
}

/// Statements of a block, without comments
fn block_statements(body: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = body.walk();
    let statements = body
        .named_children(&mut cursor)
        .filter(|n| n.kind() != "comment")
        .collect();
    statements
}

fn is_docstring(statement: Node<'_>) -> bool {
    if statement.kind() != "expression_statement" || statement.named_child_count() != 1 {
        return false;
    }
    let mut cursor = statement.walk();
    let is_string = statement
        .named_children(&mut cursor)
        .any(|c| c.kind() == "string");
    is_string
}

/// Return statements that belong to the function owning `node`
///
/// Nested functions, classes and lambdas are not descended into.
fn collect_returns<'t>(node: Node<'t>, out: &mut Vec<Node<'t>>) {
    let mut cursor = node.walk();
    let children: Vec<Node<'t>> = node.named_children(&mut cursor).collect();
    for child in children {
        match child.kind() {
            "function_definition" | "class_definition" | "lambda" => {}
            "return_statement" => out.push(child),
            _ => collect_returns(child, out),
        }
    }
}

/// Names of the parameters in a `parameters` node
pub fn parameter_names(params: Node<'_>, source: &str) -> Vec<String> {
    let mut cursor = params.walk();
    let children: Vec<Node<'_>> = params.named_children(&mut cursor).collect();

    children
        .into_iter()
        .filter_map(|param| match param.kind() {
            "identifier" => Some(source[param.byte_range()].to_string()),
            "default_parameter" | "typed_default_parameter" => param
                .child_by_field_name("name")
                .map(|n| source[n.byte_range()].to_string()),
            "typed_parameter" | "list_splat_pattern" | "dictionary_splat_pattern" => {
                first_identifier(param).map(|n| source[n.byte_range()].to_string())
            }
            _ => None,
        })
        .collect()
}

fn first_identifier(node: Node<'_>) -> Option<Node<'_>> {
    if node.kind() == "identifier" {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
    children.into_iter().find_map(first_identifier)
}

/// Apply edits to the source in offset order
///
/// **Private** - edits never overlap; an overlapping edit is dropped
fn apply_edits(source: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by_key(|e| (e.start, Reverse(e.depth)));

    let extra: usize = edits.iter().map(|e| e.text.len()).sum();
    let mut out = String::with_capacity(source.len() + extra);
    let mut cursor = 0;

    for edit in edits {
        if edit.start < cursor {
            debug!("Dropping overlapping edit at byte {}", edit.start);
            continue;
        }
        out.push_str(&source[cursor..edit.start]);
        out.push_str(&edit.text);
        cursor = edit.end;
    }
    out.push_str(&source[cursor..]);

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instrument(source: &str) -> StructuredRewrite {
        let tree = parse_python(source).unwrap();
        rewrite(&tree, source, "s", |_| true, |row| row)
    }

    #[test]
    fn test_parse_failure_reports_line() {
        let err = parse_python("def ok():\n    pass\n\ndef broken(:\n    pass\n").unwrap_err();
        assert!(err.contains("syntax error"), "{}", err);
    }

    #[test]
    fn test_entry_and_exit_wrap_body() {
        let source = "def greet(name, punct='!'):\n    msg = 'hi ' + name\n    print(msg)\n";
        let result = instrument(source);
        let lines: Vec<&str> = result.code.split('\n').collect();

        assert_eq!(result.functions, vec!["greet"]);
        assert_eq!(lines[0], "def greet(name, punct='!'):");
        assert!(lines[1].starts_with("    print(\"[DEBUG:s] \""));
        assert!(lines[1].contains("| greet:1 | ENTRY | args="));
        assert!(lines[1].contains("{\"name\": name, \"punct\": punct}"));
        assert_eq!(lines[2], "    msg = 'hi ' + name");
        assert_eq!(lines[3], "    print(msg)");
        assert!(lines[4].starts_with("    print("));
        assert!(lines[4].contains("| greet:1 | EXIT | return=null"));
        assert!(parse_python(&result.code).is_ok());
    }

    #[test]
    fn test_return_values_traced() {
        let source = "def pick(a, b):\n    if a:\n        return a\n    return\n";
        let result = instrument(source);
        assert!(result.code.contains("| pick:3 | EXIT | return="));
        assert!(result.code.contains(")((a))"));
        assert!(result.code.contains("| pick:4 | EXIT | return="));
        assert!(result.code.contains(")((None))"));
        assert!(parse_python(&result.code).is_ok());
    }

    #[test]
    fn test_nested_and_methods() {
        let source = "\
class Cart:
    def total(self, *items, **opts):
        def helper(x: int):
            return x * 2
        return sum(helper(i) for i in items)
";
        let result = instrument(source);
        assert_eq!(result.functions, vec!["total", "helper"]);
        assert!(result.code.contains("{\"self\": self, \"items\": items, \"opts\": opts}"));
        assert!(result.code.contains("{\"x\": x}"));
        // the inner return is attributed to helper, the outer one to total
        assert!(result.code.contains("| helper:4 | EXIT |"));
        assert!(result.code.contains("| total:5 | EXIT |"));
        assert!(parse_python(&result.code).is_ok());
    }

    #[test]
    fn test_one_line_body_expanded() {
        let source = "def sq(n): return n * n\n";
        let result = instrument(source);
        let lines: Vec<&str> = result.code.split('\n').collect();
        assert_eq!(lines[0], "def sq(n): ");
        assert!(lines[1].contains("| sq:1 | ENTRY |"));
        assert!(lines[2].starts_with("    return (lambda _debug_ret:"));
        assert!(lines[3].contains("| sq:1 | EXIT | return=null"));
        assert!(parse_python(&result.code).is_ok());
    }

    #[test]
    fn test_docstring_stays_first() {
        let source = "def doc():\n    \"\"\"Docs.\"\"\"\n    return 1\n";
        let result = instrument(source);
        let lines: Vec<&str> = result.code.split('\n').collect();
        assert_eq!(lines[1], "    \"\"\"Docs.\"\"\"");
        assert!(lines[2].contains("| doc:1 | ENTRY |"));
    }

    #[test]
    fn test_filter_skips_but_visits_nested() {
        let source = "def outer():\n    def inner():\n        pass\n    inner()\n";
        let tree = parse_python(source).unwrap();
        let result = rewrite(&tree, source, "s", |name| name == "inner", |row| row);
        assert_eq!(result.functions, vec!["inner"]);
        assert!(!result.code.contains("| outer:"));
    }

    #[test]
    fn test_untouched_bytes_preserved() {
        let source = "# header\nX = 1  # keep\n\ndef f():\n    pass\n";
        let result = instrument(source);
        assert!(result.code.starts_with("# header\nX = 1  # keep\n\ndef f():\n"));
        assert!(result.code.ends_with("return=null\", flush=True)\n"));
    }
}
