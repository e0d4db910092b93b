//! Pattern-based instrumentation backend.
//!
//! No parser is assumed: declarations are recognised line by line with
//! regular expressions and an ENTRY statement is inserted right after each
//! matched declaration. This is the only backend for JavaScript/TypeScript
//! and the fallback for Python sources the structured backend cannot parse.

use super::emit;
use super::language::Language;
use log::debug;
use regex::{Captures, Regex};
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Words that look like a method shorthand (`if (x) {`) but are not
const JS_NON_METHOD_WORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "with", "function", "return", "else", "do", "try",
    "typeof", "new", "delete", "await", "yield", "super", "void",
];

/// Result of a pattern rewrite
#[derive(Debug, Clone)]
pub struct PatternRewrite {
    pub code: String,
    pub functions: Vec<String>,
}

/// A recognised function declaration on one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub indent: String,
    pub params: Vec<String>,
    /// Byte offset just past the matched header (after `{` or `:`)
    pub header_end: usize,
}

fn python_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        vec![Regex::new(
            r"^(?P<indent>\s*)(?:async\s+)?def\s+(?P<name>\w+)\s*\((?P<params>.*?)\)\s*(?:->\s*[^:]+)?:",
        )
        .expect("static regex")]
    })
}

fn javascript_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // function name(params) {
            r"^(?P<indent>\s*)(?:export\s+(?:default\s+)?)?(?:async\s+)?function\s*\*?\s*(?P<name>[A-Za-z_$][\w$]*)\s*\((?P<params>.*?)\)\s*(?::\s*[^{]+)?\{",
            // const name = function(params) {
            r"^(?P<indent>\s*)(?:export\s+)?(?:const|let|var)\s+(?P<name>[A-Za-z_$][\w$]*)\s*(?::\s*[^=]+)?=\s*(?:async\s+)?function\s*\*?\s*(?:[A-Za-z_$][\w$]*)?\s*\((?P<params>.*?)\)\s*(?::\s*[^{]+)?\{",
            // const name = (params) => {
            r"^(?P<indent>\s*)(?:export\s+)?(?:const|let|var)\s+(?P<name>[A-Za-z_$][\w$]*)\s*(?::\s*[^=]+)?=\s*(?:async\s+)?\((?P<params>.*?)\)\s*(?::\s*[^=]+)?=>\s*\{",
            // const name = param => {
            r"^(?P<indent>\s*)(?:export\s+)?(?:const|let|var)\s+(?P<name>[A-Za-z_$][\w$]*)\s*=\s*(?:async\s+)?(?P<params>[A-Za-z_$][\w$]*)\s*=>\s*\{",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static regex"))
        .collect()
    })
}

/// `name(params) {` method shorthand; also matches calls ending in a
/// callback brace, so matches go through `is_parameter_list`
fn js_method_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(?P<indent>\s*)(?:(?:public|private|protected|static|readonly|override|abstract)\s+)*(?:async\s+)?\*?\s*(?P<name>[A-Za-z_$][\w$]*)\s*\((?P<params>.*?)\)\s*(?::\s*[^{]+)?\{",
        )
        .expect("static regex")
    })
}

fn js_binding_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\b(?:const|let|var)\s+([A-Za-z_$][\w$]*)").expect("static regex")
    })
}

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_$][\w$]*$").expect("static regex"))
}

/// Recognise a function declaration on a single line
pub fn match_declaration(language: Language, line: &str) -> Option<Declaration> {
    let patterns = match language {
        Language::Python => python_patterns(),
        Language::JavaScript => javascript_patterns(),
    };

    if let Some(decl) = patterns
        .iter()
        .find_map(|pattern| pattern.captures(line).map(|caps| declaration_from(&caps)))
    {
        return Some(decl);
    }

    if language != Language::JavaScript {
        return None;
    }

    let caps = js_method_pattern().captures(line)?;
    let params = caps.name("params").map_or("", |m| m.as_str());
    if JS_NON_METHOD_WORDS.contains(&&caps["name"]) || !is_parameter_list(params) {
        return None;
    }
    Some(declaration_from(&caps))
}

/// True when `params` can be a parameter list rather than call arguments
///
/// Call sites such as `describe('x', function () {` or
/// `load(a).then(function (r) {` capture unbalanced parentheses or an
/// inline function.
fn is_parameter_list(params: &str) -> bool {
    let mut depth: i32 = 0;
    for c in params.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }

    depth == 0
        && !params.contains("=>")
        && !params
            .split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
            .any(|word| word == "function")
}

/// Build a declaration from regex captures
///
/// **Private** - internal helper for match_declaration
fn declaration_from(caps: &Captures<'_>) -> Declaration {
    let header_end = caps.get(0).map_or(0, |m| m.end());
    Declaration {
        name: caps["name"].to_string(),
        indent: caps["indent"].to_string(),
        params: parse_params(caps.name("params").map_or("", |m| m.as_str())),
        header_end,
    }
}

/// Extract plain parameter names from a parameter list
///
/// Type annotations, defaults, rest/splat markers and optional markers are
/// stripped; destructuring patterns are skipped.
pub fn parse_params(params: &str) -> Vec<String> {
    params
        .split(',')
        .filter_map(|param| {
            let name = param
                .trim()
                .trim_start_matches("...")
                .trim_start_matches('*')
                .split([':', '='])
                .next()
                .unwrap_or("")
                .trim()
                .trim_end_matches('?');
            identifier_pattern()
                .is_match(name)
                .then(|| name.to_string())
        })
        .collect()
}

/// Names bound by declarations or function parameters in `lines`
///
/// Used for JavaScript STATE capture, where local bindings cannot be
/// enumerated at runtime.
pub fn collect_bindings(lines: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut bindings = Vec::new();

    for line in lines {
        let params = match_declaration(Language::JavaScript, line)
            .map(|decl| decl.params)
            .unwrap_or_default();
        let declared = js_binding_pattern()
            .captures_iter(line)
            .map(|caps| caps[1].to_string());

        for name in declared.chain(params) {
            if seen.insert(name.clone()) {
                bindings.push(name);
            }
        }
    }

    bindings
}

/// Instrument every matching declaration with an ENTRY statement
///
/// **Public** - pattern backend entry point
///
/// # Arguments
/// * `source` - Source text (STATE lines already inserted)
/// * `language` - Target language
/// * `session_id` - Session id embedded in the emitted statements
/// * `wants` - Function filter
/// * `line_of` - Maps a 1-based line of `source` to the line reported in
///   ENTRY locations
pub fn rewrite(
    source: &str,
    language: Language,
    session_id: &str,
    wants: impl Fn(&str) -> bool,
    line_of: impl Fn(usize) -> usize,
) -> PatternRewrite {
    let lines: Vec<&str> = source.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut functions = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        let Some(decl) = match_declaration(language, line) else {
            out.push(line.to_string());
            continue;
        };

        if !wants(&decl.name) {
            out.push(line.to_string());
            continue;
        }

        let line_no = line_of(index + 1);
        let entry = match language {
            Language::Python => emit::python_entry(session_id, &decl.name, line_no, &decl.params),
            Language::JavaScript => {
                emit::javascript_entry(session_id, &decl.name, line_no, &decl.params)
            }
        };
        let rest = &line[decl.header_end..];

        match language {
            Language::Python if !is_blank_or_comment(rest, language) => {
                // `def f(): return 1` has nowhere to put a separate line
                debug!("Skipping one-line def '{}' at line {}", decl.name, line_no);
                out.push(line.to_string());
                continue;
            }
            Language::JavaScript if closes_on_same_line(rest) => {
                out.push(format!(
                    "{} {}{}",
                    &line[..decl.header_end],
                    entry,
                    rest
                ));
            }
            _ => {
                let indent = body_indent(&lines[index + 1..], &decl.indent, language);
                out.push(line.to_string());
                out.push(format!("{}{}", indent, entry));
            }
        }

        debug!("Instrumented '{}' at line {}", decl.name, line_no);
        functions.push(decl.name);
    }

    PatternRewrite {
        code: out.join("\n"),
        functions,
    }
}

/// Indentation for a line inserted at the top of a body
///
/// Uses the next non-blank line when it is nested deeper than the
/// declaration, otherwise one language indent level past it.
pub fn body_indent(following: &[&str], decl_indent: &str, language: Language) -> String {
    let next = following
        .iter()
        .find(|l| !l.trim().is_empty())
        .map(|l| leading_whitespace(l));

    match next {
        Some(indent) if indent.len() > decl_indent.len() && indent.starts_with(decl_indent) => {
            indent.to_string()
        }
        _ => format!("{}{}", decl_indent, language.indent_unit()),
    }
}

pub fn leading_whitespace(line: &str) -> &str {
    let trimmed = line.trim_start_matches([' ', '\t']);
    &line[..line.len() - trimmed.len()]
}

/// True when the body opened by the header brace also closes on this line
///
/// **Private** - brace counting ignores braces inside quotes
fn closes_on_same_line(rest: &str) -> bool {
    let mut depth: i32 = 1;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in rest.chars() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' | '`' => quote = Some(c),
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}

fn is_blank_or_comment(rest: &str, language: Language) -> bool {
    let rest = rest.trim();
    let comment = match language {
        Language::Python => "#",
        Language::JavaScript => "//",
    };
    rest.is_empty() || rest.starts_with(comment)
}
