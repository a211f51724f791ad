//! Output formatting for incremental coverage results, plus the CI output
//! channel (`$GITHUB_OUTPUT`).

use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::Write as _;

use crate::aggregate::Aggregation;
use crate::error::Result;
use crate::model::CoverageResult;

/// Render the result the way the CI workflow expects it: a percentage
/// with two decimals, or the distinguished no-data sentence.
#[must_use]
pub fn render_coverage(result: &CoverageResult) -> String {
    match result.ratio() {
        Some(ratio) => format!("{:.2}%", ratio * 100.0),
        None => "No instrumented code was changed.".to_string(),
    }
}

/// Format a human-readable summary of the aggregation.
#[must_use]
pub fn format_text(aggregation: &Aggregation, diff_files: usize, diff_lines: usize) -> String {
    let mut out = String::new();

    if diff_files == 0 {
        out.push_str("No added lines found in diff.\n");
        return out;
    }

    writeln!(out, "Diff adds {diff_lines} lines across {diff_files} files").unwrap();

    match aggregation.result {
        CoverageResult::NoInstrumentedChange => {
            out.push_str("No instrumented code was changed.\n");
        }
        CoverageResult::Ratio { covered, changed } => {
            let pct = covered as f64 / changed as f64 * 100.0;
            writeln!(
                out,
                "Incremental coverage: {pct:.2}% ({covered}/{changed} instrumented lines covered)"
            )
            .unwrap();

            let files_with_misses: Vec<_> = aggregation
                .files
                .iter()
                .filter(|f| !f.missed_lines.is_empty())
                .collect();
            if !files_with_misses.is_empty() {
                out.push('\n');
                for f in files_with_misses {
                    writeln!(
                        out,
                        "  {}  {}/{} ({:.1}%)  missed: {}",
                        f.path,
                        f.covered_lines.len(),
                        f.total(),
                        f.rate() * 100.0,
                        format_line_ranges(&f.missed_lines),
                    )
                    .unwrap();
                }
            }
        }
    }

    out
}

/// Write a `name=value` pair to the file named by `$GITHUB_OUTPUT`.
/// Outside of GitHub Actions, print it to stdout instead.
pub fn set_output(name: &str, value: &str) -> Result<()> {
    match std::env::var_os("GITHUB_OUTPUT") {
        Some(path) => {
            let mut file = OpenOptions::new().create(true).append(true).open(path)?;
            writeln!(file, "{name}={value}")?;
        }
        None => println!("OUTPUT {name}={value}"),
    }
    Ok(())
}

/// Coalesce sorted line numbers into `(start, end)` ranges of consecutive
/// lines.
#[must_use]
pub fn coalesce_ranges(lines: &[u32]) -> Vec<(u32, u32)> {
    if lines.is_empty() {
        return Vec::new();
    }

    debug_assert!(
        lines.windows(2).all(|w| w[0] < w[1]),
        "coalesce_ranges requires sorted, deduplicated input"
    );

    let mut ranges: Vec<(u32, u32)> = Vec::new();
    let mut start = lines[0];
    let mut end = lines[0];

    for &line in &lines[1..] {
        if line == end + 1 {
            end = line;
        } else {
            ranges.push((start, end));
            start = line;
            end = line;
        }
    }

    ranges.push((start, end));
    ranges
}

/// Format line numbers into compact range notation, e.g. "1, 3-5, 8".
///
/// The input slice must be sorted in ascending order.
#[must_use]
pub fn format_line_ranges(lines: &[u32]) -> String {
    coalesce_ranges(lines)
        .iter()
        .map(|&(start, end)| {
            if start == end {
                start.to_string()
            } else {
                format!("{start}-{end}")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}
