//! Integration Test: Blocking I/O Prohibition
//!
//! Code running on the runtime uses async I/O only. Synchronous functions
//! that run before the runtime does real work (configuration loading, log
//! file setup) may use `std::fs`. `reqwest::blocking` is never allowed.

use architectural_enforcement::{assert_clean, production_sources, SourceFile, Violation};

/// Blocking APIs forbidden inside async code
const BLOCKING_IN_ASYNC: &[(&str, &str)] = &[
    ("std::fs::", "Blocking file I/O in async code"),
    ("std::net::", "Blocking network I/O in async code"),
    ("std::process::Command", "Blocking process I/O in async code"),
    ("std::io::stdin()", "Blocking stdin in async code"),
];

fn blocking_violations(file: &SourceFile) -> Vec<Violation> {
    let mut violations = Vec::new();
    for idx in 0..file.lines.len() {
        if file.is_test_code(idx) {
            continue;
        }
        let code = file.code(idx);
        if code.contains("reqwest::blocking") {
            violations.push(file.violation(idx, "Blocking HTTP client"));
            continue;
        }
        if code.trim_start().starts_with("use ") || !file.is_async_context(idx) {
            continue;
        }
        if let Some((_, reason)) = BLOCKING_IN_ASYNC.iter().find(|(api, _)| code.contains(api)) {
            violations.push(file.violation(idx, *reason));
        }
    }
    violations
}

#[test]
fn test_no_blocking_io_in_production_code() {
    let sources = production_sources();
    assert!(!sources.is_empty(), "no production sources found");

    let violations: Vec<Violation> = sources.iter().flat_map(blocking_violations).collect();
    assert_clean("Blocking I/O prohibition", &violations);
}

#[test]
fn test_detects_fs_in_async_fn() {
    let file = SourceFile::from_content(
        "bad.rs",
        "async fn load() {\n    let s = std::fs::read_to_string(\"x\")?;\n}",
    );
    assert_eq!(blocking_violations(&file).len(), 1);
}

#[test]
fn test_detects_fs_in_spawned_task() {
    let file = SourceFile::from_content(
        "bad.rs",
        "fn start() {\n    tokio::spawn(async move {\n        std::fs::write(\"x\", b\"y\");\n    });\n}",
    );
    assert_eq!(blocking_violations(&file).len(), 1);
}

#[test]
fn test_allows_fs_before_runtime_work() {
    let file = SourceFile::from_content(
        "ok.rs",
        "pub fn load_config() {\n    let s = std::fs::read_to_string(\"x\");\n}",
    );
    assert!(blocking_violations(&file).is_empty());
}

#[test]
fn test_blocking_http_always_rejected() {
    let file = SourceFile::from_content(
        "bad.rs",
        "fn fetch() {\n    let body = reqwest::blocking::get(url);\n}",
    );
    assert_eq!(blocking_violations(&file).len(), 1);
}
