//! Architectural Enforcement Integration Tests
//!
//! Source scans that keep production code honest:
//! - No sleep() calls; timed behavior waits on timers or I/O
//! - No `unwrap()` / `expect()`; errors are propagated
//!
//! Helpers here locate the workspace and walk production sources. Test
//! modules (`#[cfg(test)]` through end of file) are skipped.

use std::fs;
use std::path::{Path, PathBuf};

/// Crates whose `src/` trees count as production code
pub const PRODUCTION_DIRS: &[&str] = &["presenter/core/src", "presenter/relay/src"];

/// One offending line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// File containing the line
    pub path: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// The line, trimmed
    pub text: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} - {}", self.path.display(), self.line, self.text)
    }
}

/// Workspace root (two levels above this crate)
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// Every `.rs` file under the production directories
#[must_use]
pub fn production_sources() -> Vec<PathBuf> {
    let root = workspace_root();
    PRODUCTION_DIRS
        .iter()
        .map(|dir| root.join(dir))
        .filter(|dir| dir.exists())
        .flat_map(|dir| {
            walkdir::WalkDir::new(dir)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
                .map(walkdir::DirEntry::into_path)
        })
        .collect()
}

/// Code lines of `content` before its test module, comments stripped
///
/// Yields `(line_number, code, original_line)`.
pub fn production_lines(content: &str) -> impl Iterator<Item = (usize, &str, &str)> {
    content
        .lines()
        .enumerate()
        .take_while(|(_, line)| line.trim() != "#[cfg(test)]")
        .map(|(idx, line)| {
            let code = line.split("//").next().unwrap_or(line);
            (idx + 1, code, line)
        })
}

/// Scan every production file, flagging code lines that match `forbidden`
#[must_use]
pub fn scan(forbidden: impl Fn(&str) -> bool) -> Vec<Violation> {
    let mut violations = Vec::new();
    for path in production_sources() {
        let Ok(content) = fs::read_to_string(&path) else {
            continue;
        };
        for (line, code, original) in production_lines(&content) {
            if forbidden(code) {
                violations.push(Violation {
                    path: path.clone(),
                    line,
                    text: original.trim().to_string(),
                });
            }
        }
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_lines_stop_at_test_module() {
        let source = "fn a() {}\n#[cfg(test)]\nmod tests { fn b() { x.unwrap(); } }\n";
        let lines: Vec<_> = production_lines(source).collect();
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn test_comments_are_stripped() {
        let source = "let a = 1; // x.unwrap()\n";
        let (_, code, _) = production_lines(source).next().unwrap();
        assert!(!code.contains("unwrap"));
    }

    #[test]
    fn test_production_sources_found() {
        assert!(
            !production_sources().is_empty(),
            "no production sources under {}",
            workspace_root().display()
        );
    }
}
