//! GitHub API change source: fetches the files touched by a pull request
//! along with their unified-diff patches.

use std::collections::HashMap;

use anyhow::{Context as _, Result};
use serde::Deserialize;

use crate::diff::{self, ChangeSource};

/// Changed lines for a pull request, resolved through the GitHub API.
///
/// Mirrors the CI workflow: look up the PR's merge commit, then list the
/// files of that commit. Entries without a `patch` field (binary files)
/// are skipped.
pub struct PullRequestSource {
    token: String,
    repo: String,
    pr_number: u64,
}

impl PullRequestSource {
    /// Create a source for `repo` (e.g. "shaka-project/shaka-player") and
    /// a PR number, reading the API token from `GITHUB_TOKEN`.
    pub fn from_env(repo: &str, pr_number: u64) -> Result<Self> {
        let token = std::env::var("GITHUB_TOKEN")
            .context("GITHUB_TOKEN environment variable is required")?;
        Ok(Self {
            token,
            repo: repo.to_string(),
            pr_number,
        })
    }
}

impl ChangeSource for PullRequestSource {
    fn changed_files(&self) -> Result<HashMap<String, Vec<u32>>> {
        eprintln!(
            "Fetching changed files for {}/pull/{} ...",
            self.repo, self.pr_number
        );

        let pull: PullRequest = get_json(
            &self.token,
            &format!(
                "https://api.github.com/repos/{}/pulls/{}",
                self.repo, self.pr_number
            ),
        )
        .context("Failed to fetch pull request")?;

        let commit: Commit = get_json(
            &self.token,
            &format!(
                "https://api.github.com/repos/{}/commits/{}",
                self.repo, pull.merge_commit_sha
            ),
        )
        .context("Failed to fetch merge commit")?;

        Ok(changed_lines_from_files(&commit.files))
    }

    fn pr_number(&self) -> Option<u64> {
        Some(self.pr_number)
    }
}

/// Extract changed lines from a list of API file entries, skipping binary
/// files (no patch) and warning on unparseable patches so one bad file
/// cannot invalidate the rest.
pub fn changed_lines_from_files(files: &[CommitFile]) -> HashMap<String, Vec<u32>> {
    let mut changes = HashMap::new();
    for file in files {
        let Some(ref patch) = file.patch else {
            continue;
        };
        match diff::changed_lines(patch) {
            Ok(lines) => {
                changes.insert(file.filename.clone(), lines);
            }
            Err(e) => {
                eprintln!("Warning: skipping patch for {}: {e}", file.filename);
            }
        }
    }
    changes
}

#[derive(Deserialize)]
struct PullRequest {
    merge_commit_sha: String,
}

#[derive(Deserialize)]
struct Commit {
    #[serde(default)]
    files: Vec<CommitFile>,
}

/// One entry of the commits API `files` array.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitFile {
    pub filename: String,
    /// Absent for binary files.
    #[serde(default)]
    pub patch: Option<String>,
}

fn get_json<T: serde::de::DeserializeOwned>(token: &str, url: &str) -> Result<T> {
    let resp = ureq::get(url)
        .set("Authorization", &format!("Bearer {}", token))
        .set("Accept", "application/vnd.github+json")
        .set("User-Agent", "incrcov")
        .set("X-GitHub-Api-Version", "2022-11-28")
        .call()
        .with_context(|| format!("GitHub API request failed: {url}"))?;
    resp.into_json()
        .context("Failed to parse GitHub API response")
}
