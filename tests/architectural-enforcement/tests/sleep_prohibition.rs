//! Integration Test: Sleep Prohibition
//!
//! Production code never blocks a runtime thread with `std::thread::sleep`.
//! Timed waits on the runtime are allowed only where the wait is the point:
//! the channel retry timer and frame pacing in the display loop. Periodic
//! work uses `tokio::time::interval`.

use architectural_enforcement::{assert_clean, production_sources, SourceFile, Violation};

/// Words that mark an intentional timed wait
const ALLOWED_WAIT_CONTEXT: &[&str] = &["retry", "frame"];

fn sleep_violations(file: &SourceFile) -> Vec<Violation> {
    let mut violations = Vec::new();
    for idx in 0..file.lines.len() {
        let code = file.code(idx);
        if file.is_test_code(idx) {
            continue;
        }
        if code.contains("thread::sleep") {
            violations.push(file.violation(idx, "Blocking thread sleep"));
        } else if (code.contains("::sleep(") || code.contains(".sleep("))
            && !file.mentions_nearby(idx, 10, ALLOWED_WAIT_CONTEXT)
        {
            violations.push(file.violation(idx, "Sleep outside retry timer or frame pacing"));
        }
    }
    violations
}

#[test]
fn test_no_sleep_in_production_code() {
    let sources = production_sources();
    assert!(!sources.is_empty(), "no production sources found");

    let violations: Vec<Violation> = sources.iter().flat_map(sleep_violations).collect();
    assert_clean("Sleep prohibition", &violations);
}

#[test]
fn test_detects_thread_sleep() {
    let file = SourceFile::from_content(
        "bad.rs",
        "fn poll() {\n    std::thread::sleep(Duration::from_millis(10));\n}",
    );
    let found = sleep_violations(&file);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].line, 2);
}

#[test]
fn test_allows_retry_timer() {
    let file = SourceFile::from_content(
        "ok.rs",
        "fn schedule_retry() {\n    tokio::spawn(async move {\n        tokio::time::sleep(delay).await;\n    });\n}",
    );
    assert!(sleep_violations(&file).is_empty());
}

#[test]
fn test_rejects_polling_sleep() {
    let file = SourceFile::from_content(
        "bad.rs",
        "async fn wait_ready() {\n    while !ready() {\n        tokio::time::sleep(Duration::from_millis(5)).await;\n    }\n}",
    );
    assert_eq!(sleep_violations(&file).len(), 1);
}

#[test]
fn test_ignores_test_modules() {
    let file = SourceFile::from_content(
        "ok.rs",
        "fn real() {}\n#[cfg(test)]\nmod tests {\n    fn t() { std::thread::sleep(d); }\n}",
    );
    assert!(sleep_violations(&file).is_empty());
}
