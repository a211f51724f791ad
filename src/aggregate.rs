//! Combines changed lines from a diff with resolved instrumentation to
//! produce the incremental coverage ratio.

use std::collections::HashMap;

use crate::model::{CoverageResult, FileIncrementalCoverage, LineSet};

/// Aggregated incremental coverage across all changed files.
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub result: CoverageResult,
    /// Per-file detail, sorted by path. Only files with at least one
    /// instrumented changed line appear here.
    pub files: Vec<FileIncrementalCoverage>,
}

/// Intersect changed lines with instrumentation, per file and in total.
///
/// Files present only in the diff (no instrumentation: docs, configs,
/// uninstrumented sources) or only in the instrumentation (unchanged)
/// contribute nothing. Only instrumented changed lines count toward the
/// denominator, so whitespace and comment lines inside changed files are
/// excluded as well.
#[must_use]
pub fn incremental_coverage(
    changes: &HashMap<String, Vec<u32>>,
    coverage: &HashMap<String, LineSet>,
) -> Aggregation {
    let mut num_changed: u64 = 0;
    let mut num_covered: u64 = 0;
    let mut files = Vec::new();

    for (path, changed_lines) in changes {
        let Some(line_set) = coverage.get(path) else {
            continue;
        };

        let mut covered_lines = Vec::new();
        let mut missed_lines = Vec::new();
        for &line in changed_lines {
            if line_set.instrumented.contains(&line) {
                num_changed += 1;
                if line_set.executed.contains(&line) {
                    num_covered += 1;
                    covered_lines.push(line);
                } else {
                    missed_lines.push(line);
                }
            }
        }

        if !covered_lines.is_empty() || !missed_lines.is_empty() {
            covered_lines.sort_unstable();
            missed_lines.sort_unstable();
            files.push(FileIncrementalCoverage {
                path: path.clone(),
                covered_lines,
                missed_lines,
            });
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));

    let result = if num_changed == 0 {
        CoverageResult::NoInstrumentedChange
    } else {
        CoverageResult::Ratio {
            covered: num_covered,
            changed: num_changed,
        }
    };

    Aggregation { result, files }
}
