//! Reader for Istanbul / NYC-style instrumentation JSON
//! (`coverage-details.json`).
//!
//! The format is a JSON object keyed by file path. Each value contains:
//!   - `statementMap`: `{ "0": { "start": { "line": 7, "column": 0 }, "end": { "line": 8, "column": 29 } }, ... }`
//!   - `fnMap`:        `{ "0": { "loc": { "start": { "line": 7 }, "end": { "line": 8 } } }, ... }`
//!   - `s`:            `{ "0": 5, "1": 0, ... }` — execution counts per statement
//!
//! Only line numbers are read; columns are ignored.

use std::collections::HashMap;

use regex::Regex;
use serde_json::Value;

use crate::error::{IncrcovError, Result};
use crate::model::{FileInstrumentation, LineRange, LineSet};
use crate::resolve;

/// Strips the absolute path of the CI runner's clone from instrumented
/// file paths, leaving repo-relative paths that match diff paths.
///
/// Windows-style separators are normalized first so reports from Windows
/// runners work too. `/home/runner/work/repo/lib/player.js` becomes
/// `lib/player.js` when `lib` is one of the configured roots.
pub struct PathNormalizer {
    pattern: Regex,
}

impl PathNormalizer {
    /// Build a normalizer for the given repo root directories.
    pub fn new(roots: &[String]) -> Result<Self> {
        let alternatives: Vec<String> = roots.iter().map(|r| regex::escape(r)).collect();
        let pattern = Regex::new(&format!(r"^.*?/({})/", alternatives.join("|")))?;
        Ok(Self { pattern })
    }

    /// Normalize one instrumented file path.
    #[must_use]
    pub fn normalize(&self, path: &str) -> String {
        let unix = path.replace('\\', "/");
        self.pattern.replace(&unix, "$1/").into_owned()
    }
}

impl Default for PathNormalizer {
    /// Default roots used by the coverage workflow.
    fn default() -> Self {
        Self::new(&["lib".to_string(), "ui".to_string()]).expect("static pattern")
    }
}

/// Parse an instrumentation report into per-file raw instrumentation,
/// keyed by normalized path. A malformed top-level document is an error;
/// per-file problems are deferred to [`resolve_all`] so one bad entry
/// cannot invalidate the rest of the report.
pub fn parse_report(
    input: &[u8],
    normalizer: &PathNormalizer,
) -> Result<Vec<(String, Result<FileInstrumentation>)>> {
    let document: Value = serde_json::from_slice(input)?;
    let entries = document.as_object().ok_or_else(|| {
        IncrcovError::MalformedInstrumentation("top-level JSON is not an object".to_string())
    })?;

    let mut files = Vec::with_capacity(entries.len());
    for (path, entry) in entries {
        files.push((normalizer.normalize(path), parse_file_entry(entry)));
    }
    Ok(files)
}

/// Resolve every file in a parsed report into its [`LineSet`], skipping
/// files whose instrumentation is malformed with a warning on stderr.
#[must_use]
pub fn resolve_all(
    files: Vec<(String, Result<FileInstrumentation>)>,
) -> HashMap<String, LineSet> {
    let mut resolved = HashMap::with_capacity(files.len());
    for (path, entry) in files {
        let line_set = entry.and_then(|file| resolve::resolve(&file));
        match line_set {
            Ok(line_set) => {
                resolved.insert(path, line_set);
            }
            Err(e) => {
                eprintln!("Warning: skipping instrumentation for {path}: {e}");
            }
        }
    }
    resolved
}

/// Parse a single file entry (`statementMap` + `fnMap` + `s`).
fn parse_file_entry(entry: &Value) -> Result<FileInstrumentation> {
    let malformed = |detail: &str| IncrcovError::MalformedInstrumentation(detail.to_string());

    let entry = entry
        .as_object()
        .ok_or_else(|| malformed("file entry is not an object"))?;

    let statement_map = entry
        .get("statementMap")
        .and_then(|v| v.as_object())
        .ok_or_else(|| malformed("missing statementMap"))?;
    let fn_map = entry
        .get("fnMap")
        .and_then(|v| v.as_object())
        .ok_or_else(|| malformed("missing fnMap"))?;
    let counts_map = entry
        .get("s")
        .and_then(|v| v.as_object())
        .ok_or_else(|| malformed("missing execution counts ('s')"))?;

    // Istanbul ids are stringified integers emitted in source order;
    // sorting numerically restores that order regardless of how the JSON
    // object keys were serialized or stored. Both maps need it: the
    // resolver's subtractions are order-sensitive for statements and for
    // functions alike.
    let mut statements = Vec::with_capacity(statement_map.len());
    for id in sorted_ids(statement_map) {
        let range = parse_range(&statement_map[id])
            .ok_or_else(|| malformed(&format!("bad statement range for id '{id}'")))?;
        statements.push((id.clone(), range));
    }

    let mut functions = Vec::with_capacity(fn_map.len());
    for id in sorted_ids(fn_map) {
        let range = fn_map[id]
            .get("loc")
            .and_then(parse_range)
            .ok_or_else(|| malformed(&format!("bad function location for id '{id}'")))?;
        functions.push(range);
    }

    let mut counts = HashMap::with_capacity(counts_map.len());
    for (id, value) in counts_map {
        let count = value
            .as_u64()
            .ok_or_else(|| malformed(&format!("non-integer execution count for id '{id}'")))?;
        counts.insert(id.clone(), count);
    }

    Ok(FileInstrumentation {
        statements,
        functions,
        counts,
    })
}

/// Map keys in numeric id order, with a lexicographic fallback for ids
/// that are not integers.
fn sorted_ids(map: &serde_json::Map<String, Value>) -> Vec<&String> {
    let mut ids: Vec<&String> = map.keys().collect();
    ids.sort_by_key(|id| (id.parse::<u64>().ok(), id.to_string()));
    ids
}

/// Read `{ "start": { "line": N }, "end": { "line": M } }`.
fn parse_range(value: &Value) -> Option<LineRange> {
    let line_of = |key: &str| {
        value
            .get(key)
            .and_then(|loc| loc.get("line"))
            .and_then(|l| l.as_u64())
            .map(|l| l as u32)
    };
    Some(LineRange::new(line_of("start")?, line_of("end")?))
}
