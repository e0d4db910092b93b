use debug_trace_studio::aggregator::{analyze_logs, AnomalyConfig};
use debug_trace_studio::output::{
    render_report, to_report, write_report, OutputFormat, ReportConfig,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const LOG: &str = "\
[DEBUG:demo] 2024-02-02T08:00:00.000 | checkout:10 | ENTRY | args={\"cart\": [1, 2]}
[DEBUG:demo] 2024-02-02T08:00:00.010 | line:12 | STATE | locals={\"subtotal\": 3}
[DEBUG:demo] 2024-02-02T08:00:00.020 | checkout:10 | EXIT | return=3
[DEBUG:demo] 2024-02-02T08:00:01.000 | pay:20 | ENTRY | args={\"amount\": 3}
[DEBUG:demo] 2024-02-02T08:00:01.500 | pay:20 | ERROR | card declined
";

fn result() -> debug_trace_studio::aggregator::AnalysisResult {
    analyze_logs(LOG, None, &AnomalyConfig::default())
}

#[test]
fn test_markdown_report() {
    let config = ReportConfig::new().with_trace(true);
    let report = render_report(&result(), &config).unwrap();

    let expected = "\
# Debug Log Analysis

**Session ID:** `demo`

**Total Log Entries:** 5

**Time Range:** 2024-02-02T08:00:00.000000 to 2024-02-02T08:00:01.500000


## Functions Called

- `checkout`
- `line`
- `pay`

## Anomalies Detected

🔴 **UNCLOSED_CALL** at `pay:20`
   Function pay was entered but never exited

🔴 **LOGGED_ERROR** at `pay:20`
   Error at pay:20: {\"raw\":\"card declined\"}


## Execution Trace

```
checkout (20.00ms) ✓
  → args: {\"cart\":[1,2]}
  | state: {\"locals\":{\"subtotal\":3}}
  ← return: 3
pay ✗ (no exit)
  → args: {\"amount\":3}
```

## State Changes

```
[08:00:00.010] line:12: {\"locals\":{\"subtotal\":3}}
```";

    assert_eq!(report, expected);
}

#[test]
fn test_text_report() {
    let config = ReportConfig::new().with_format(OutputFormat::Text);
    let report = render_report(&result(), &config).unwrap();

    assert_eq!(
        report,
        "Debug Log Analysis - Session: demo\n\
         Total entries: 5\n\
         Functions: checkout, line, pay\n\
         \n\
         Anomalies:\n  \
         [HIGH] UNCLOSED_CALL: Function pay was entered but never exited\n  \
         [HIGH] LOGGED_ERROR: Error at pay:20: {\"raw\":\"card declined\"}"
    );
}

#[test]
fn test_json_report_mirrors_result() {
    let report = to_report(&result());

    assert_eq!(report.session_id, "demo");
    assert_eq!(report.total_entries, 5);
    assert_eq!(report.functions_called, vec!["checkout", "line", "pay"]);
    assert_eq!(report.execution_trace.len(), 2);
    assert_eq!(report.execution_trace[0].name, "checkout");
    assert_eq!(report.execution_trace[0].state_count, 1);
    assert!(!report.execution_trace[1].has_exit);
    assert_eq!(report.state_change_count, 1);
    assert_eq!(report.orphan_state_count, 0);

    let rendered = render_report(&result(), &ReportConfig::new().with_format(OutputFormat::Json))
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
    assert_eq!(value["anomalies"][1]["type"], "LOGGED_ERROR");
}

#[test]
fn test_write_report_to_nested_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out/analysis.md");
    let report = render_report(&result(), &ReportConfig::default()).unwrap();

    write_report(&report, &path).unwrap();
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        format!("{}\n", report)
    );
}
