//! Command handler functions for the incrcov CLI.
//!
//! Each `cmd_*` function returns its output as a `String`, making them easy
//! to test without capturing stdout.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};

use crate::diff::ChangeSource;
use crate::instrument::{self, PathNormalizer};
use crate::{aggregate, report};

/// Core incremental-coverage flow: read and resolve the instrumentation
/// report, obtain changed lines from the source, aggregate, and format.
///
/// With `github_output` set, also writes `pr_number` (when the source
/// knows it) and `coverage` to the CI output channel.
pub fn cmd_compute(
    source: &dyn ChangeSource,
    coverage_file: &Path,
    path_roots: &[String],
    github_output: bool,
) -> Result<String> {
    let coverage = load_coverage(coverage_file, path_roots)?;

    let changes = source.changed_files()?;
    let diff_files = changes.len();
    let diff_lines: usize = changes.values().map(|v| v.len()).sum();

    let aggregation = aggregate::incremental_coverage(&changes, &coverage);
    let out = report::format_text(&aggregation, diff_files, diff_lines);

    if github_output {
        if let Some(pr_number) = source.pr_number() {
            report::set_output("pr_number", &pr_number.to_string())
                .context("Failed to write pr_number output")?;
        }
        report::set_output("coverage", &report::render_coverage(&aggregation.result))
            .context("Failed to write coverage output")?;
    }

    Ok(out)
}

/// Show the resolved instrumented/executed line sets for one source file.
pub fn cmd_lines(
    coverage_file: &Path,
    path_roots: &[String],
    source_file: &str,
    executed: bool,
    unexecuted: bool,
) -> Result<String> {
    let coverage = load_coverage(coverage_file, path_roots)?;

    let line_set = coverage
        .get(source_file)
        .with_context(|| format!("No instrumentation data for '{source_file}'"))?;

    if unexecuted {
        let unexecuted_lines: Vec<u32> = line_set
            .instrumented
            .difference(&line_set.executed)
            .copied()
            .collect();

        if unexecuted_lines.is_empty() {
            return Ok(format!(
                "All instrumented lines executed in '{source_file}'\n"
            ));
        }

        let mut out = String::new();
        writeln!(out, "Unexecuted lines in '{source_file}':").unwrap();
        writeln!(out, "  {}", report::format_line_ranges(&unexecuted_lines)).unwrap();
        writeln!(out, "  ({} lines)", unexecuted_lines.len()).unwrap();
        Ok(out)
    } else if executed {
        let executed_lines: Vec<u32> = line_set.executed.iter().copied().collect();

        if executed_lines.is_empty() {
            return Ok(format!("No instrumented lines executed in '{source_file}'\n"));
        }

        let mut out = String::new();
        writeln!(out, "Executed lines in '{source_file}':").unwrap();
        writeln!(out, "  {}", report::format_line_ranges(&executed_lines)).unwrap();
        writeln!(out, "  ({} lines)", executed_lines.len()).unwrap();
        Ok(out)
    } else {
        let mut out = String::new();
        writeln!(out, "{:>6}  EXECUTED", "LINE").unwrap();
        writeln!(out, "{}", "-".repeat(16)).unwrap();
        for line in &line_set.instrumented {
            let marker = if line_set.executed.contains(line) {
                "✓"
            } else {
                "✗"
            };
            writeln!(out, "{:>6}  {}", line, marker).unwrap();
        }
        Ok(out)
    }
}

/// Read and resolve an instrumentation report from disk.
fn load_coverage(
    coverage_file: &Path,
    path_roots: &[String],
) -> Result<std::collections::HashMap<String, crate::model::LineSet>> {
    let normalizer = PathNormalizer::new(path_roots)?;
    let content = std::fs::read(coverage_file)
        .with_context(|| format!("Failed to read {}", coverage_file.display()))?;
    let files = instrument::parse_report(&content, &normalizer)
        .with_context(|| format!("Failed to parse {}", coverage_file.display()))?;
    Ok(instrument::resolve_all(files))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;

    use super::*;

    /// A canned change source for tests.
    struct FakeChanges {
        changes: HashMap<String, Vec<u32>>,
        pr_number: Option<u64>,
    }

    impl ChangeSource for FakeChanges {
        fn changed_files(&self) -> Result<HashMap<String, Vec<u32>>> {
            Ok(self.changes.clone())
        }

        fn pr_number(&self) -> Option<u64> {
            self.pr_number
        }
    }

    /// Write a small instrumentation report to a temp file: lib/player.js
    /// with statements on lines 1-2 (executed) and 3-4 (never executed).
    fn write_coverage_file(dir: &tempfile::TempDir) -> PathBuf {
        let json = r#"{
            "/ci/clone/lib/player.js": {
                "statementMap": {
                    "0": { "start": { "line": 1, "column": 0 }, "end": { "line": 2, "column": 1 } },
                    "1": { "start": { "line": 3, "column": 0 }, "end": { "line": 4, "column": 1 } }
                },
                "fnMap": {},
                "s": { "0": 5, "1": 0 }
            }
        }"#;
        let path = dir.path().join("coverage-details.json");
        std::fs::write(&path, json).unwrap();
        path
    }

    fn roots() -> Vec<String> {
        vec!["lib".to_string(), "ui".to_string()]
    }

    #[test]
    fn test_cmd_compute() {
        let dir = tempfile::tempdir().unwrap();
        let coverage_file = write_coverage_file(&dir);

        let source = FakeChanges {
            changes: HashMap::from([("lib/player.js".to_string(), vec![1, 2, 3, 4])]),
            pr_number: None,
        };

        let out = cmd_compute(&source, &coverage_file, &roots(), false).unwrap();

        assert!(out.contains("Diff adds 4 lines across 1 files"));
        assert!(out.contains("Incremental coverage: 50.00% (2/4"));
        assert!(out.contains("missed: 3-4"));
    }

    #[test]
    fn test_cmd_compute_no_instrumented_change() {
        let dir = tempfile::tempdir().unwrap();
        let coverage_file = write_coverage_file(&dir);

        let source = FakeChanges {
            changes: HashMap::from([("docs/upgrade.md".to_string(), vec![1, 2])]),
            pr_number: None,
        };

        let out = cmd_compute(&source, &coverage_file, &roots(), false).unwrap();

        assert!(out.contains("No instrumented code was changed."));
    }

    #[test]
    fn test_cmd_compute_empty_diff() {
        let dir = tempfile::tempdir().unwrap();
        let coverage_file = write_coverage_file(&dir);

        let source = FakeChanges {
            changes: HashMap::new(),
            pr_number: None,
        };

        let out = cmd_compute(&source, &coverage_file, &roots(), false).unwrap();

        assert!(out.contains("No added lines found in diff."));
    }

    #[test]
    fn test_cmd_compute_missing_coverage_file() {
        let source = FakeChanges {
            changes: HashMap::new(),
            pr_number: None,
        };

        let result = cmd_compute(&source, Path::new("missing.json"), &roots(), false);
        assert!(result.is_err());
    }

    #[test]
    fn test_cmd_lines() {
        let dir = tempfile::tempdir().unwrap();
        let coverage_file = write_coverage_file(&dir);

        let out = cmd_lines(&coverage_file, &roots(), "lib/player.js", false, false).unwrap();

        assert!(out.contains("LINE"));
        assert!(out.contains("✓"));
        assert!(out.contains("✗"));
    }

    #[test]
    fn test_cmd_lines_unexecuted() {
        let dir = tempfile::tempdir().unwrap();
        let coverage_file = write_coverage_file(&dir);

        let out = cmd_lines(&coverage_file, &roots(), "lib/player.js", false, true).unwrap();

        assert!(out.contains("Unexecuted lines in 'lib/player.js':"));
        assert!(out.contains("3-4"));
        assert!(out.contains("(2 lines)"));
    }

    #[test]
    fn test_cmd_lines_executed() {
        let dir = tempfile::tempdir().unwrap();
        let coverage_file = write_coverage_file(&dir);

        let out = cmd_lines(&coverage_file, &roots(), "lib/player.js", true, false).unwrap();

        assert!(out.contains("Executed lines in 'lib/player.js':"));
        assert!(out.contains("1-2"));
        assert!(out.contains("(2 lines)"));
    }

    #[test]
    fn test_cmd_lines_unknown_file() {
        let dir = tempfile::tempdir().unwrap();
        let coverage_file = write_coverage_file(&dir);

        let result = cmd_lines(&coverage_file, &roots(), "lib/other.js", false, false);
        assert!(result.is_err());
    }
}
