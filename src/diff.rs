//! Parse unified diffs to extract which lines were added in each file.
//! Added-line numbers are 1-indexed and refer to the new (post-change)
//! file content, matching the numbering used by instrumentation reports.
//!
//! Also provides a [`ChangeSource`] trait that abstracts over different
//! ways to obtain the changed-line map (stdin, a diff file, git, the
//! GitHub API).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::Context;

use crate::error::{IncrcovError, Result};

// ---------------------------------------------------------------------------
// Change sources
// ---------------------------------------------------------------------------

/// A source for the map of file path → added line numbers.
pub trait ChangeSource {
    /// Fetch the changed lines per file.
    fn changed_files(&self) -> anyhow::Result<HashMap<String, Vec<u32>>>;

    /// The pull request number this change set belongs to, if any.
    fn pr_number(&self) -> Option<u64> {
        None
    }
}

/// Unified diff read from stdin.
pub struct StdinDiff;

impl ChangeSource for StdinDiff {
    fn changed_files(&self) -> anyhow::Result<HashMap<String, Vec<u32>>> {
        let text =
            std::io::read_to_string(std::io::stdin()).context("Failed to read diff from stdin")?;
        Ok(parse_diff(&text)?)
    }
}

/// Unified diff read from a file on disk.
pub struct FileDiff {
    pub path: PathBuf,
}

impl FileDiff {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl ChangeSource for FileDiff {
    fn changed_files(&self) -> anyhow::Result<HashMap<String, Vec<u32>>> {
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read diff from {}", self.path.display()))?;
        Ok(parse_diff(&text)?)
    }
}

/// Diff from a git command (e.g., `git diff HEAD~1`).
pub struct GitDiff {
    /// Arguments to pass to `git diff`.
    pub args: String,
}

impl ChangeSource for GitDiff {
    fn changed_files(&self) -> anyhow::Result<HashMap<String, Vec<u32>>> {
        let diff_args: Vec<&str> = self.args.split_whitespace().collect();
        let output = Command::new("git")
            .arg("diff")
            .args(&diff_args)
            .output()
            .context("Failed to run git diff")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("git diff failed: {stderr}");
        }

        let text = String::from_utf8(output.stdout).context("git diff output not valid UTF-8")?;
        Ok(parse_diff(&text)?)
    }
}

// ---------------------------------------------------------------------------
// Diff parsing
// ---------------------------------------------------------------------------

/// Parse one file's patch (hunks only, as returned in the `patch` field of
/// the GitHub commits/pulls API) and return the added line numbers in the
/// new version of the file.
pub fn changed_lines(patch: &str) -> Result<Vec<u32>> {
    let mut touched: Vec<u32> = Vec::new();
    // None until the first hunk header has been seen.
    let mut current_line: Option<u32> = None;

    for line in patch.lines() {
        if line.starts_with("@@") {
            current_line = Some(parse_hunk_header(line)?);
        } else if line.starts_with('\\') {
            // "\ No newline at end of file" — diff metadata, not a real line
        } else if let Some(first) = line.chars().next() {
            let number = current_line.ok_or_else(|| {
                IncrcovError::MalformedDiff(format!("content before any hunk header: '{line}'"))
            })?;
            match first {
                ' ' => current_line = Some(number + 1),
                '+' => {
                    touched.push(number);
                    current_line = Some(number + 1);
                }
                '-' => {} // Removed line — doesn't exist in the new file
                other => {
                    return Err(IncrcovError::MalformedDiff(format!(
                        "unexpected line prefix '{other}' in patch"
                    )));
                }
            }
        }
        // An entirely empty line is a context line whose content is empty;
        // GitHub serializes those as " " so a truly empty line only shows
        // up at the very end of the patch text. Ignore it.
    }

    Ok(touched)
}

/// Parse a full multi-file unified diff (e.g., `git diff` output) and
/// return a map of file path → added line numbers.
pub fn parse_diff(diff_text: &str) -> Result<HashMap<String, Vec<u32>>> {
    let mut result: HashMap<String, Vec<u32>> = HashMap::new();
    let mut current_file: Option<String> = None;
    let mut new_line_number: u32 = 0;
    let mut in_hunk = false;

    for line in diff_text.lines() {
        if let Some(rest) = line.strip_prefix("+++ ") {
            in_hunk = false;
            if rest == "/dev/null" {
                current_file = None; // File was deleted
            } else {
                // Strip common VCS prefixes: "b/" (default git), "a/" (some
                // tools). Also handles --no-prefix diffs.
                let path = rest
                    .strip_prefix("b/")
                    .or_else(|| rest.strip_prefix("a/"))
                    .unwrap_or(rest);
                current_file = Some(path.to_string());
            }
        } else if line.starts_with("@@") {
            new_line_number = parse_hunk_header(line)?;
            in_hunk = true;
        } else if !in_hunk {
            // Between-file metadata: "diff --git", "index", "--- a/...",
            // mode changes, etc.
        } else if let Some(ref file) = current_file {
            if line.starts_with('\\') {
                // "\ No newline at end of file"
            } else if line.starts_with('+') {
                result
                    .entry(file.clone())
                    .or_default()
                    .push(new_line_number);
                new_line_number += 1;
            } else if line.starts_with('-') {
                // Deleted line — doesn't advance the new-file counter
            } else {
                // Context line
                new_line_number += 1;
            }
        }
    }

    Ok(result)
}

/// Parse the new-file start line from a hunk header like
/// `@@ -10,5 +20,8 @@ fn foo()`. The count suffix (`,8`) is optional and
/// omitted for single-line hunks (`@@ -0,0 +1 @@`).
fn parse_hunk_header(line: &str) -> Result<u32> {
    let malformed = || IncrcovError::MalformedDiff(format!("bad hunk header: '{line}'"));

    let after_at = line.strip_prefix("@@ ").ok_or_else(malformed)?;
    let mut parts = after_at.split(' ');
    // First part is "-old_start[,old_count]".
    parts.next().ok_or_else(malformed)?;
    let new_part = parts
        .next()
        .and_then(|p| p.strip_prefix('+'))
        .ok_or_else(malformed)?;
    new_part
        .split(',')
        .next()
        .and_then(|s| s.parse::<u32>().ok())
        .ok_or_else(malformed)
}
