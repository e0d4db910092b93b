use debug_trace_studio::aggregator::{
    analyze_logs, check_slow_calls, reconstruct, slow_call_threshold, AnomalyConfig, AnomalyKind,
    Severity,
};
use debug_trace_studio::parser::parse_events;

/// Build a log of sequential calls with the given durations (ms)
fn calls_log(session: &str, start_second: u32, durations_ms: &[u32]) -> String {
    let mut log = String::new();
    for (i, duration) in durations_ms.iter().enumerate() {
        let base = (start_second + i as u32 * 2) * 1000;
        let end = base + duration;
        log.push_str(&format!(
            "[DEBUG:{}] 2024-01-01T00:{:02}:{:02}.{:03} | work:{} | ENTRY | args={{}}\n",
            session,
            base / 60_000,
            (base / 1000) % 60,
            base % 1000,
            i
        ));
        log.push_str(&format!(
            "[DEBUG:{}] 2024-01-01T00:{:02}:{:02}.{:03} | work:{} | EXIT | return=1\n",
            session,
            end / 60_000,
            (end / 1000) % 60,
            end % 1000,
            i
        ));
    }
    log
}

#[test]
fn test_unclosed_call_yields_one_high() {
    let log = "[DEBUG:s] 2024-01-01T00:00:00 | hang:1 | ENTRY | args={}\n";
    let result = analyze_logs(log, None, &AnomalyConfig::default());

    let unclosed: Vec<_> = result
        .anomalies
        .iter()
        .filter(|a| a.kind == AnomalyKind::UnclosedCall)
        .collect();
    assert_eq!(unclosed.len(), 1);
    assert_eq!(unclosed[0].severity, Severity::High);
    assert_eq!(unclosed[0].location, "hang:1");
}

#[test]
fn test_threshold_from_ten_equal_calls() {
    let (mean, threshold) = slow_call_threshold(&[10.0; 10], 10.0).unwrap();
    assert_eq!(mean, 10.0);
    assert_eq!(threshold, 100.0);
}

#[test]
fn test_slow_call_boundary_around_ten_ms_mean() {
    // 1000 calls of 10ms keep the mean near 10ms, so the threshold sits near 101ms
    let mut durations = vec![10; 1000];
    durations.push(150);
    let trace = reconstruct(&parse_events(&calls_log("s", 0, &durations), None));
    let slow = check_slow_calls(&trace.calls, 10.0);
    assert_eq!(slow.len(), 1);
    assert_eq!(slow[0].evidence, Some(150.0));

    let mut durations = vec![10; 1000];
    durations.push(95);
    let trace = reconstruct(&parse_events(&calls_log("s", 0, &durations), None));
    assert_eq!(trace.calls.len(), 1001);
    assert!(check_slow_calls(&trace.calls, 10.0).is_empty());
}

#[test]
fn test_slow_call_flagged_against_mean() {
    // 20 calls of 10ms plus one 500ms call: mean ~33.3ms, threshold ~333ms
    let mut durations = vec![10; 20];
    durations.push(500);
    let log = calls_log("s", 0, &durations);

    let trace = reconstruct(&parse_events(&log, None));
    let slow = check_slow_calls(&trace.calls, 10.0);

    assert_eq!(slow.len(), 1);
    assert_eq!(slow[0].severity, Severity::Medium);
    assert_eq!(slow[0].evidence, Some(500.0));
    assert!(slow[0].message.contains("500.00ms"));
}

#[test]
fn test_no_completed_calls_skips_slow_check() {
    let log = "[DEBUG:s] 2024-01-01T00:00:00 | f | ENTRY |\n";
    let trace = reconstruct(&parse_events(log, None));
    assert!(check_slow_calls(&trace.calls, 10.0).is_empty());
}

#[test]
fn test_errors_and_null_returns() {
    let log = "\
[DEBUG:s] 2024-01-01T00:00:00 | load:1 | ENTRY | args={}
[DEBUG:s] 2024-01-01T00:00:01 | load:1 | ERROR | file missing
[DEBUG:s] 2024-01-01T00:00:02 | load:1 | EXIT | return=\"None\"
[DEBUG:s] 2024-01-01T00:00:03 | save:2 | ENTRY | args={}
[DEBUG:s] 2024-01-01T00:00:04 | save:2 | EXIT |
[DEBUG:s] 2024-01-01T00:00:05 | ghost:3 | EXIT | return=1
";
    let result = analyze_logs(log, None, &AnomalyConfig::default());
    let kinds: Vec<AnomalyKind> = result.anomalies.iter().map(|a| a.kind).collect();

    assert_eq!(
        kinds,
        vec![
            AnomalyKind::LoggedError,
            AnomalyKind::NullReturn,
            AnomalyKind::NullReturn,
            AnomalyKind::DanglingExit,
        ]
    );
    assert_eq!(result.anomalies[0].severity, Severity::High);
    assert_eq!(result.anomalies[3].severity, Severity::Low);
}

#[test]
fn test_session_isolation() {
    // session "a" alone: mean ~22.7ms, threshold ~114ms at factor 5, so 150ms is slow
    let mut a = vec![10; 10];
    a.push(150);
    let b = vec![5000; 3];

    let log = format!("{}{}", calls_log("a", 0, &a), calls_log("b", 30, &b));
    let config = AnomalyConfig::default().with_slow_call_factor(5.0);

    let only_a = analyze_logs(&log, Some("a"), &config);
    assert_eq!(only_a.session_id, "a");
    assert_eq!(only_a.calls.len(), 11);
    assert!(only_a.calls.iter().all(|c| c.entry().session_id == "a"));
    let slow: Vec<_> = only_a
        .anomalies
        .iter()
        .filter(|x| x.kind == AnomalyKind::SlowCall)
        .collect();
    assert_eq!(slow.len(), 1);
    assert_eq!(slow[0].evidence, Some(150.0));

    // mixing in session "b" raises the mean and hides the slow call
    let mixed = analyze_logs(&log, None, &config);
    assert!(mixed
        .anomalies
        .iter()
        .all(|x| x.kind != AnomalyKind::SlowCall));
}
