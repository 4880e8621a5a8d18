//! Architectural Enforcement Integration Tests
//!
//! This package scans the companion core's production sources for patterns
//! that break its threading and error-handling rules:
//! - No sleep() calls; every wait is on a channel or a join
//! - No unwrap()/expect() or panicking macros outside test modules
//! - Only the session drives the model handle
//!
//! The scanner is line based. Everything from a file's `#[cfg(test)]`
//! attribute onwards is treated as test code, and comment text is ignored.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Production sources of the companion core
#[must_use]
pub fn core_src_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../companion/core/src")
}

/// A forbidden pattern found in production code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// File the pattern was found in
    pub path: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// The offending line, trimmed
    pub text: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} - {}", self.path.display(), self.line, self.text)
    }
}

/// Code portion of each production line, paired with its 1-based number
///
/// Stops at the first `#[cfg(test)]`; strips `//` comments.
#[must_use]
pub fn production_lines(content: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if line.trim_start().starts_with("#[cfg(test)]") {
            break;
        }
        let code = line.split("//").next().unwrap_or(line);
        if !code.trim().is_empty() {
            out.push((idx + 1, code));
        }
    }
    out
}

/// Scan every `.rs` file under `dir` for lines matching `is_violation`
///
/// `is_violation` receives the file path and the comment-stripped code.
pub fn scan(dir: &Path, is_violation: impl Fn(&Path, &str) -> bool) -> Vec<Violation> {
    let mut violations = Vec::new();
    if !dir.exists() {
        return violations;
    }

    for entry in walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("rs") {
            continue;
        }
        let Ok(content) = fs::read_to_string(path) else {
            continue;
        };
        for (line, code) in production_lines(&content) {
            if is_violation(path, code) {
                violations.push(Violation {
                    path: path.to_path_buf(),
                    line,
                    text: code.trim().to_string(),
                });
            }
        }
    }
    violations
}

/// Print violations and fail the calling test if there are any
///
/// # Panics
///
/// Panics when `violations` is non-empty.
pub fn assert_none(rule: &str, violations: &[Violation]) {
    if violations.is_empty() {
        return;
    }
    eprintln!("\n❌ CRITICAL: {rule}\n");
    for violation in violations {
        eprintln!("  ❌ {violation}");
    }
    panic!(
        "\nFound {} violation(s) in production code.\nFix these before merging!",
        violations.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_module_is_skipped() {
        let content = "fn real() {\n    x.unwrap();\n}\n\n#[cfg(test)]\nmod tests {\n    y.unwrap();\n}\n";
        let lines = production_lines(content);
        assert_eq!(lines, vec![(1, "fn real() {"), (2, "    x.unwrap();"), (3, "}")]);
    }

    #[test]
    fn test_comments_are_stripped() {
        let content = "/// Never call .unwrap() here\nlet a = 1; // .expect(\"no\")\n";
        let lines = production_lines(content);
        assert_eq!(lines, vec![(2, "let a = 1; ")]);
    }

    #[test]
    fn test_missing_directory_scans_nothing() {
        let violations = scan(Path::new("/definitely/not/here"), |_, _| true);
        assert!(violations.is_empty());
    }

    #[test]
    fn test_core_src_dir_exists() {
        assert!(core_src_dir().join("lib.rs").exists());
    }
}
