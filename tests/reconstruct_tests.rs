use debug_trace_studio::aggregator::reconstruct;
use debug_trace_studio::parser::parse_events;

#[test]
fn test_single_entry_exit_pair() {
    let log = "\
[DEBUG:s] 2024-01-01T12:00:00.000 | compute:3 | ENTRY | args={\"n\": 4}
[DEBUG:s] 2024-01-01T12:00:00.250 | compute:3 | EXIT | return=16
";
    let trace = reconstruct(&parse_events(log, None));

    assert_eq!(trace.calls.len(), 1);
    let call = &trace.calls[0];
    assert_eq!(call.name(), "compute");
    assert!(call.is_closed());
    assert_eq!(call.duration_ms(), Some(250.0));
    assert_eq!(call.return_value().unwrap().to_string(), "16");
}

#[test]
fn test_recursion_closes_inner_first() {
    let log = "\
[DEBUG:s] 2024-01-01T12:00:00 | fact:1 | ENTRY | args={\"n\": 2}
[DEBUG:s] 2024-01-01T12:00:01 | fact:1 | ENTRY | args={\"n\": 1}
[DEBUG:s] 2024-01-01T12:00:02 | fact:1 | EXIT | return=1
[DEBUG:s] 2024-01-01T12:00:04 | fact:1 | EXIT | return=2
";
    let trace = reconstruct(&parse_events(log, None));

    assert_eq!(trace.calls.len(), 2);
    assert!(trace.calls.iter().all(|c| c.is_closed()));
    // inner call (1s) completes before the outer one (4s)
    assert_eq!(trace.calls[0].duration_ms(), Some(1000.0));
    assert_eq!(trace.calls[1].duration_ms(), Some(4000.0));
    assert_eq!(trace.calls[0].args().unwrap().to_string(), "{\"n\":1}");
    assert!(trace.dangling_exits.is_empty());
}

#[test]
fn test_interleaved_functions_match_by_name() {
    let log = "\
[DEBUG:s] 2024-01-01T12:00:00 | outer | ENTRY |
[DEBUG:s] 2024-01-01T12:00:01 | inner | ENTRY |
[DEBUG:s] 2024-01-01T12:00:02 | outer | EXIT | return=1
[DEBUG:s] 2024-01-01T12:00:03 | inner | EXIT | return=2
";
    let trace = reconstruct(&parse_events(log, None));

    let names: Vec<&str> = trace.calls.iter().map(|c| c.name()).collect();
    assert_eq!(names, vec!["outer", "inner"]);
    assert_eq!(trace.calls[0].duration_ms(), Some(2000.0));
    assert_eq!(trace.calls[1].duration_ms(), Some(2000.0));
}

#[test]
fn test_events_resorted_by_timestamp() {
    let log = "\
[DEBUG:s] 2024-01-01T12:00:05 | f | EXIT | return=1
[DEBUG:s] 2024-01-01T12:00:00 | f | ENTRY |
";
    let trace = reconstruct(&parse_events(log, None));
    assert_eq!(trace.calls.len(), 1);
    assert_eq!(trace.calls[0].duration_ms(), Some(5000.0));
}
