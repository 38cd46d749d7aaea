//! Architectural Enforcement
//!
//! Source-scanning helpers shared by the integration tests in `tests/`.
//! The rules they enforce:
//! - production code never blocks the runtime thread (no `std::thread::sleep`,
//!   no `reqwest::blocking`, no std file/network I/O inside async code)
//! - timed waits exist only as the channel retry timer or frame pacing
//!
//! Everything after a `#[cfg(test)]` line is treated as test code, matching
//! how every crate in this workspace places its unit tests.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Production source roots, relative to the workspace root
pub const PRODUCTION_DIRS: &[&str] = &["lookbook/core/src", "display/src"];

/// Workspace root, resolved from this crate's manifest directory
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
}

/// One scanned Rust source file
#[derive(Debug)]
pub struct SourceFile {
    /// Path relative to the workspace root
    pub path: PathBuf,
    /// File content split into lines
    pub lines: Vec<String>,
}

/// A rule violation at a specific line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// File the violation is in
    pub path: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// What was found
    pub reason: &'static str,
    /// The offending line, trimmed
    pub text: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} - {}: {}",
            self.path.display(),
            self.line,
            self.reason,
            self.text
        )
    }
}

impl SourceFile {
    /// Build from in-memory content
    #[must_use]
    pub fn from_content(path: impl Into<PathBuf>, content: &str) -> Self {
        Self {
            path: path.into(),
            lines: content.lines().map(str::to_string).collect(),
        }
    }

    /// The code part of a line, without a trailing `//` comment
    #[must_use]
    pub fn code(&self, idx: usize) -> &str {
        let line = self.lines[idx].as_str();
        line.split("//").next().unwrap_or(line)
    }

    /// Whether the line sits in a test module or test function
    #[must_use]
    pub fn is_test_code(&self, idx: usize) -> bool {
        if self.lines[..idx]
            .iter()
            .any(|l| l.trim().starts_with("#[cfg(test)]"))
        {
            return true;
        }
        match self.enclosing_fn(idx) {
            Some(fn_idx) => self.lines[..fn_idx]
                .iter()
                .rev()
                .take_while(|l| l.trim().starts_with("#[") || l.trim().starts_with("///"))
                .any(|l| {
                    let l = l.trim();
                    l.starts_with("#[test]") || l.starts_with("#[tokio::test")
                }),
            None => false,
        }
    }

    /// Index of the nearest function signature at or above `idx`
    #[must_use]
    pub fn enclosing_fn(&self, idx: usize) -> Option<usize> {
        (0..=idx).rev().find(|&i| is_fn_signature(&self.lines[i]))
    }

    /// Whether the line runs on the async runtime
    ///
    /// True inside an `async fn`, or inside an `async` block opened in the
    /// current function (e.g. a spawned task).
    #[must_use]
    pub fn is_async_context(&self, idx: usize) -> bool {
        let Some(fn_idx) = self.enclosing_fn(idx) else {
            return false;
        };
        if self.lines[fn_idx].contains("async fn") {
            return true;
        }
        self.lines[fn_idx..idx]
            .iter()
            .any(|l| l.contains("async move") || l.contains("async {"))
    }

    /// Whether any line within `radius` of `idx` mentions one of `words`
    #[must_use]
    pub fn mentions_nearby(&self, idx: usize, radius: usize, words: &[&str]) -> bool {
        let start = idx.saturating_sub(radius);
        let end = (idx + radius + 1).min(self.lines.len());
        self.lines[start..end].iter().any(|l| {
            let lower = l.to_lowercase();
            words.iter().any(|w| lower.contains(w))
        })
    }

    /// Record a violation at `idx`
    #[must_use]
    pub fn violation(&self, idx: usize, reason: &'static str) -> Violation {
        Violation {
            path: self.path.clone(),
            line: idx + 1,
            reason,
            text: self.lines[idx].trim().to_string(),
        }
    }
}

/// Whether a line declares a function
#[must_use]
pub fn is_fn_signature(line: &str) -> bool {
    let mut rest = line.trim_start();
    for prefix in ["pub(crate) ", "pub(super) ", "pub ", "const ", "async ", "unsafe "] {
        rest = rest.strip_prefix(prefix).unwrap_or(rest);
    }
    // second pass for combinations like `pub async`
    for prefix in ["async ", "unsafe "] {
        rest = rest.strip_prefix(prefix).unwrap_or(rest);
    }
    rest.starts_with("fn ")
}

/// Every `.rs` file under the production roots
#[must_use]
pub fn production_sources() -> Vec<SourceFile> {
    let root = workspace_root();
    let mut files = Vec::new();
    for dir in PRODUCTION_DIRS {
        for entry in walkdir::WalkDir::new(root.join(dir))
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        {
            let Ok(content) = fs::read_to_string(entry.path()) else {
                continue;
            };
            let relative = entry
                .path()
                .strip_prefix(&root)
                .unwrap_or(entry.path())
                .to_path_buf();
            files.push(SourceFile::from_content(relative, &content));
        }
    }
    files
}

/// Fail with a readable report if any violations were found
///
/// # Panics
///
/// Panics when `violations` is not empty.
pub fn assert_clean(rule: &str, violations: &[Violation]) {
    if violations.is_empty() {
        return;
    }
    let report: Vec<String> = violations.iter().map(ToString::to_string).collect();
    panic!(
        "\n{rule}: {} violation(s) in production code\n  {}\n",
        violations.len(),
        report.join("\n  ")
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(src: &str) -> SourceFile {
        SourceFile::from_content("x.rs", src)
    }

    #[test]
    fn test_fn_signatures() {
        assert!(is_fn_signature("fn main() {"));
        assert!(is_fn_signature("    pub async fn run(&mut self) {"));
        assert!(is_fn_signature("pub(crate) fn helper() -> u8 {"));
        assert!(!is_fn_signature("let f = |x| x;"));
        assert!(!is_fn_signature("// fn commented()"));
    }

    #[test]
    fn test_async_context() {
        let f = file("async fn a() {\n    std::fs::read(\"x\");\n}\nfn b() {\n    std::fs::read(\"x\");\n}");
        assert!(f.is_async_context(1));
        assert!(!f.is_async_context(4));
    }

    #[test]
    fn test_spawned_block_is_async() {
        let f = file("fn spawn_it() {\n    tokio::spawn(async move {\n        work();\n    });\n}");
        assert!(f.is_async_context(2));
        assert!(!f.is_async_context(1));
    }

    #[test]
    fn test_test_code_detection() {
        let f = file("fn real() {}\n#[cfg(test)]\nmod tests {\n    fn helper() {}\n}");
        assert!(!f.is_test_code(0));
        assert!(f.is_test_code(3));

        let g = file("#[tokio::test]\nasync fn test_x() {\n    sleep();\n}");
        assert!(g.is_test_code(2));
    }

    #[test]
    fn test_code_strips_comments() {
        let f = file("let x = 1; // std::thread::sleep");
        assert_eq!(f.code(0).trim(), "let x = 1;");
    }
}
