//! Uniform in-memory representation of instrumentation and diff data,
//! independent of where it came from. The resolver and aggregator operate
//! only on these types; they never touch the raw JSON or patch text.

use std::collections::{BTreeSet, HashMap};

/// Compute a coverage rate, returning 0.0 when the total is zero.
#[must_use]
pub fn rate(covered: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        covered as f64 / total as f64
    }
}

/// An inclusive source line range attributed to one statement or function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    pub start_line: u32,
    pub end_line: u32,
}

impl LineRange {
    pub fn new(start_line: u32, end_line: u32) -> Self {
        Self {
            start_line,
            end_line,
        }
    }

    /// Expand the range into its full set of line numbers. An inverted
    /// range (end before start) yields the empty set.
    #[must_use]
    pub fn lines(&self) -> BTreeSet<u32> {
        (self.start_line..=self.end_line).collect()
    }
}

/// Raw per-statement instrumentation for a single source file, as read
/// from an Istanbul-style report. Read-only input to the resolver.
#[derive(Debug, Clone, Default)]
pub struct FileInstrumentation {
    /// Statement spans in source order, keyed by their opaque ids.
    pub statements: Vec<(String, LineRange)>,
    /// Function body spans.
    pub functions: Vec<LineRange>,
    /// Execution counts keyed by statement id. 0 means never executed.
    pub counts: HashMap<String, u64>,
}

/// Resolved per-file line classification produced by the resolver.
///
/// Invariant: `executed` is a subset of `instrumented`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineSet {
    /// Lines owned by at least one statement after nested-span subtraction.
    pub instrumented: BTreeSet<u32>,
    /// The subset of `instrumented` belonging to a statement that ran.
    pub executed: BTreeSet<u32>,
}

/// The outcome of the aggregation across all changed files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageResult {
    /// No changed line was instrumented. Distinct from a 0.0 ratio: a
    /// change touching only comments or non-code files lands here.
    NoInstrumentedChange,
    /// `covered` of `changed` instrumented changed lines were executed.
    Ratio { covered: u64, changed: u64 },
}

impl CoverageResult {
    /// The ratio in [0.0, 1.0], or `None` for [`NoInstrumentedChange`].
    ///
    /// [`NoInstrumentedChange`]: CoverageResult::NoInstrumentedChange
    #[must_use]
    pub fn ratio(&self) -> Option<f64> {
        match self {
            CoverageResult::NoInstrumentedChange => None,
            CoverageResult::Ratio { covered, changed } => Some(rate(*covered, *changed)),
        }
    }
}

/// Per-file incremental coverage detail.
#[derive(Debug, Clone)]
pub struct FileIncrementalCoverage {
    pub path: String,
    /// Changed lines that are instrumented and executed.
    pub covered_lines: Vec<u32>,
    /// Changed lines that are instrumented and NOT executed.
    pub missed_lines: Vec<u32>,
}

impl FileIncrementalCoverage {
    #[must_use]
    pub fn total(&self) -> usize {
        self.covered_lines.len() + self.missed_lines.len()
    }

    #[must_use]
    pub fn rate(&self) -> f64 {
        rate(self.covered_lines.len() as u64, self.total() as u64)
    }
}
