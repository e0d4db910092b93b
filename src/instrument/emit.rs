//! Trace statements injected into instrumented sources.
//!
//! Every statement prints one line in the trace grammar:
//! `[DEBUG:<session>] <timestamp> | <location> | <KIND> | <payload>`.
//! Statements are self-contained so no imports have to be added to the
//! target file. Serialization never raises: values JSON cannot encode
//! (cycles, tuple keys, BigInt, throwing `toJSON`) degrade to their repr
//! or string form instead of crashing the traced program.

const PY_TIMESTAMP: &str = "__import__(\"datetime\").datetime.now().isoformat()";
const JS_TIMESTAMP: &str = "new Date().toISOString()";

/// Python callable that suppresses `Exception` around a zero-arg function,
/// returning `None` when it raised
const PY_GUARD: &str = "type(\"_DebugGuard\", (__import__(\"contextlib\").ContextDecorator,), {\"__enter__\": lambda s: s, \"__exit__\": lambda s, t, *e: t is not None and issubclass(t, Exception)})()";

/// Python expression: a one-argument function returning JSON text for any value
fn python_safe_dumps() -> String {
    format!(
        "(lambda _debug_v: {g}(lambda: __import__(\"json\").dumps(_debug_v, default=repr, skipkeys=True))() or __import__(\"json\").dumps({g}(lambda: repr(_debug_v))() or object.__repr__(_debug_v)))",
        g = PY_GUARD
    )
}

/// JavaScript expression: a one-argument function returning JSON text for
/// any value; repeated objects print as `"[Circular]"`
const JS_SAFE_STRINGIFY: &str = "((v) => { try { const seen = new WeakSet(); return JSON.stringify(v, (k, x) => { if (typeof x === \"bigint\") return x.toString(); if (typeof x === \"object\" && x !== null) { if (seen.has(x)) return \"[Circular]\"; seen.add(x); } return x; }); } catch (_e) { try { return JSON.stringify(String(v)); } catch (_e2) { return \"null\"; } } })";

/// Python expression producing the line prefix up to the payload
fn python_prefix(session_id: &str, location: &str, kind: &str) -> String {
    format!(
        "\"[DEBUG:{}] \" + {} + \" | {} | {} | ",
        session_id, PY_TIMESTAMP, location, kind
    )
}

fn javascript_prefix(session_id: &str, location: &str, kind: &str) -> String {
    format!(
        "\"[DEBUG:{}] \" + {} + \" | {} | {} | ",
        session_id, JS_TIMESTAMP, location, kind
    )
}

/// `print(...)` of an ENTRY event with parameter values as JSON
pub fn python_entry(session_id: &str, function: &str, line: usize, params: &[String]) -> String {
    let args = params
        .iter()
        .map(|p| format!("\"{}\": {}", p, p))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "print({}args=\" + {}({{{}}}), flush=True)",
        python_prefix(session_id, &format!("{}:{}", function, line), "ENTRY"),
        python_safe_dumps(),
        args
    )
}

/// `print(...)` of an EXIT event for the fall-through path
pub fn python_exit(session_id: &str, function: &str, line: usize) -> String {
    format!(
        "print({}return=null\", flush=True)",
        python_prefix(session_id, &format!("{}:{}", function, line), "EXIT")
    )
}

/// Expression that prints an EXIT event with `value` and evaluates to it
pub fn python_return(session_id: &str, function: &str, line: usize, value: &str) -> String {
    format!(
        "(lambda _debug_ret: (print({}return=\" + {}(_debug_ret), flush=True), _debug_ret)[1])(({}))",
        python_prefix(session_id, &format!("{}:{}", function, line), "EXIT"),
        python_safe_dumps(),
        value
    )
}

/// `print(...)` of a STATE event with the visible local bindings
pub fn python_state(session_id: &str, line: usize) -> String {
    format!(
        "print({}locals=\" + {}({{k: v for k, v in locals().items() if not k.startswith(\"_\")}}), flush=True)",
        python_prefix(session_id, &format!("line:{}", line), "STATE"),
        python_safe_dumps()
    )
}

/// `console.log(...)` of an ENTRY event with parameter values as JSON
pub fn javascript_entry(
    session_id: &str,
    function: &str,
    line: usize,
    params: &[String],
) -> String {
    let args = params
        .iter()
        .map(|p| format!("\"{}\": {}", p, p))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "console.log({}args=\" + {}({{ {} }}));",
        javascript_prefix(session_id, &format!("{}:{}", function, line), "ENTRY"),
        JS_SAFE_STRINGIFY,
        args
    )
}

/// `console.log(...)` of a STATE event
///
/// Each binding is read through a guarded closure so names that are not
/// in scope at this point serialize as `undefined` instead of throwing.
pub fn javascript_state(session_id: &str, line: usize, bindings: &[String]) -> String {
    let fields = bindings
        .iter()
        .map(|b| {
            format!(
                "\"{}\": (() => {{ try {{ return {}; }} catch (_e) {{ return undefined; }} }})()",
                b, b
            )
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "console.log({}locals=\" + {}({{ {} }}));",
        javascript_prefix(session_id, &format!("line:{}", line), "STATE"),
        JS_SAFE_STRINGIFY,
        fields
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_python_entry_shape() {
        let stmt = python_entry("abcd1234", "total", 3, &["a".to_string(), "b".to_string()]);
        assert!(stmt.starts_with("print(\"[DEBUG:abcd1234] \" + "));
        assert!(stmt.contains(" | total:3 | ENTRY | args=\" + "));
        assert!(stmt.contains("(_debug_v, default=repr, skipkeys=True)"));
        assert!(stmt.contains(")({\"a\": a, \"b\": b}), flush=True)"));
        assert!(stmt.ends_with("flush=True)"));
    }

    #[test]
    fn test_python_return_wraps_value() {
        let expr = python_return("s", "f", 9, "a, b");
        assert!(expr.starts_with("(lambda _debug_ret: "));
        assert!(expr.ends_with(")((a, b))"));
        assert!(expr.contains(" | f:9 | EXIT | return=\" + "));
    }

    #[test]
    fn test_javascript_entry_shape() {
        let stmt = javascript_entry("s", "handle", 12, &["req".to_string()]);
        assert!(stmt.starts_with(
            "console.log(\"[DEBUG:s] \" + new Date().toISOString() + \" | handle:12 | ENTRY | args=\" + ((v) => {"
        ));
        assert!(stmt.ends_with(")({ \"req\": req }));"));
    }

    #[test]
    fn test_serializers_never_raise() {
        let py = python_safe_dumps();
        assert!(py.contains("issubclass(t, Exception)"));
        assert!(py.contains("or object.__repr__(_debug_v)"));

        assert!(JS_SAFE_STRINGIFY.contains("new WeakSet()"));
        assert!(JS_SAFE_STRINGIFY.contains("typeof x === \"bigint\""));
        assert!(JS_SAFE_STRINGIFY.contains("catch (_e) { try { return JSON.stringify(String(v));"));
    }

    #[test]
    fn test_javascript_state_guards_bindings() {
        let stmt = javascript_state("s", 4, &["count".to_string()]);
        assert!(stmt.contains(" | line:4 | STATE | locals=\""));
        assert!(stmt.contains("try { return count; } catch (_e) { return undefined; }"));
    }
}
