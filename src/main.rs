use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use incrcov::diff::{ChangeSource, FileDiff, GitDiff, StdinDiff};
use incrcov::{cli, github};

/// incrcov — Incremental (diff) code coverage for pull requests.
#[derive(Parser)]
#[command(name = "incrcov", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute incremental coverage for a GitHub pull request.
    Pr {
        /// The GitHub repo, such as shaka-project/shaka-player.
        #[arg(long)]
        repo: String,

        /// The pull request number.
        #[arg(long)]
        pr: u64,

        /// Path to the instrumentation report (coverage-details.json).
        #[arg(long)]
        coverage_file: PathBuf,

        /// Repo root directories to strip instrumented paths to.
        #[arg(long, value_delimiter = ',', default_value = "lib,ui")]
        path_roots: Vec<String>,

        /// Write pr_number and coverage to $GITHUB_OUTPUT.
        #[arg(long)]
        github_output: bool,
    },

    /// Compute incremental coverage from a local unified diff.
    Local {
        /// Path to the instrumentation report (coverage-details.json).
        #[arg(long)]
        coverage_file: PathBuf,

        /// Read the diff from this file. If neither this nor --git-diff is
        /// given, reads a unified diff from stdin.
        #[arg(long)]
        diff_file: Option<PathBuf>,

        /// Git diff arguments, e.g. "HEAD~1" or "main..HEAD".
        #[arg(long)]
        git_diff: Option<String>,

        /// Repo root directories to strip instrumented paths to.
        #[arg(long, value_delimiter = ',', default_value = "lib,ui")]
        path_roots: Vec<String>,
    },

    /// Show resolved instrumented/executed lines for a source file.
    Lines {
        /// The source file path (repo-relative, as in the diff).
        source_file: String,

        /// Path to the instrumentation report (coverage-details.json).
        #[arg(long)]
        coverage_file: PathBuf,

        /// Show only lines that executed at least once.
        #[arg(long, conflicts_with = "unexecuted")]
        executed: bool,

        /// Show only lines that never executed.
        #[arg(long)]
        unexecuted: bool,

        /// Repo root directories to strip instrumented paths to.
        #[arg(long, value_delimiter = ',', default_value = "lib,ui")]
        path_roots: Vec<String>,
    },
}

fn main() -> Result<()> {
    let args = Cli::parse();

    let output = match args.command {
        Commands::Pr {
            repo,
            pr,
            coverage_file,
            path_roots,
            github_output,
        } => {
            let source = github::PullRequestSource::from_env(&repo, pr)?;
            cli::cmd_compute(&source, &coverage_file, &path_roots, github_output)?
        }
        Commands::Local {
            coverage_file,
            diff_file,
            git_diff,
            path_roots,
        } => {
            let source: Box<dyn ChangeSource> = match (diff_file, git_diff) {
                (Some(path), _) => Box::new(FileDiff::new(&path)),
                (None, Some(args)) => Box::new(GitDiff { args }),
                (None, None) => Box::new(StdinDiff),
            };
            cli::cmd_compute(source.as_ref(), &coverage_file, &path_roots, false)?
        }
        Commands::Lines {
            source_file,
            coverage_file,
            executed,
            unexecuted,
            path_roots,
        } => cli::cmd_lines(&coverage_file, &path_roots, &source_file, executed, unexecuted)?,
    };

    print!("{output}");
    Ok(())
}
