//! Git collaborator.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{Result, VcsError};

/// Default time budget for local git commands.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default time budget for `git push`.
pub const DEFAULT_PUSH_TIMEOUT: Duration = Duration::from_secs(120);

/// Identity used for commits when the repository has none configured.
const FALLBACK_NAME: &str = "Git Watcher";
const FALLBACK_EMAIL: &str = "gitwatch@local";

/// One line of `git status --porcelain`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    /// Index status column (`X`).
    pub index: char,

    /// Work tree status column (`Y`).
    pub worktree: char,

    /// Path relative to the repository root.
    pub path: String,

    /// Source path of a rename or copy.
    pub orig_path: Option<String>,
}

impl StatusEntry {
    /// Whether git does not track this path yet.
    pub fn is_untracked(&self) -> bool {
        self.index == '?' && self.worktree == '?'
    }
}

/// The operations the pipeline needs from version control.
///
/// Each call is bounded in time and reports execution failures as
/// [`VcsError`]; an unchanged tree is an empty status, not an error.
#[async_trait]
pub trait Vcs: Send + Sync {
    /// Working tree status against the last commit, in git's order.
    async fn status(&self) -> Result<Vec<StatusEntry>>;

    /// Unified diff covering tracked changes and the untracked entries of
    /// `entries`.
    async fn diff(&self, entries: &[StatusEntry]) -> Result<String>;

    /// Stage everything and commit with `message`.
    async fn commit_all(&self, message: &str) -> Result<()>;

    /// Push the checked-out branch to the remote.
    async fn push(&self) -> Result<()>;
}

/// Captured result of one git invocation.
#[derive(Debug)]
struct GitOutput {
    code: Option<i32>,
    stdout: String,
    stderr: String,
}

impl GitOutput {
    fn success(&self) -> bool {
        self.code == Some(0)
    }

    fn status_text(&self) -> String {
        self.code
            .map_or_else(|| "killed by signal".to_string(), |c| format!("exit {c}"))
    }
}

/// [`Vcs`] implementation backed by the `git` command line.
#[derive(Debug, Clone)]
pub struct GitCli {
    /// Working tree root.
    repo: PathBuf,

    /// Remote to push to.
    remote: String,

    /// Time budget for local commands.
    timeout: Duration,

    /// Time budget for pushes.
    push_timeout: Duration,
}

impl GitCli {
    /// Create a git collaborator for the repository at `repo`.
    pub fn new(repo: impl Into<PathBuf>) -> Self {
        Self {
            repo: repo.into(),
            remote: "origin".to_string(),
            timeout: DEFAULT_TIMEOUT,
            push_timeout: DEFAULT_PUSH_TIMEOUT,
        }
    }

    /// Set the remote to push to.
    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = remote.into();
        self
    }

    /// Set the time budget for local commands.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the time budget for pushes.
    pub fn with_push_timeout(mut self, timeout: Duration) -> Self {
        self.push_timeout = timeout;
        self
    }

    /// The repository root.
    pub fn repo(&self) -> &Path {
        &self.repo
    }

    /// Fail unless the root is a git working tree.
    pub async fn verify_repository(&self) -> Result<()> {
        let output = self
            .run(&["rev-parse", "--is-inside-work-tree"], self.timeout)
            .await?;
        if output.success() && output.stdout.trim() == "true" {
            Ok(())
        } else {
            Err(VcsError::NotARepository(self.repo.display().to_string()))
        }
    }

    /// Make sure commits have an author.
    ///
    /// When no `user.name` is configured at any level, a repository-local
    /// fallback identity is written. Returns whether it had to be written.
    pub async fn ensure_identity(&self) -> Result<bool> {
        let name = self.run(&["config", "user.name"], self.timeout).await?;
        if name.success() && !name.stdout.trim().is_empty() {
            return Ok(false);
        }

        self.run_checked(&["config", "user.name", FALLBACK_NAME], self.timeout)
            .await?;
        self.run_checked(&["config", "user.email", FALLBACK_EMAIL], self.timeout)
            .await?;
        info!(repo = %self.repo.display(), "Set fallback git identity");
        Ok(true)
    }

    /// Whether the checked-out branch has at least one commit.
    async fn has_head(&self) -> Result<bool> {
        let output = self
            .run(&["rev-parse", "--verify", "--quiet", "HEAD"], self.timeout)
            .await?;
        match output.code {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(failed("git rev-parse --verify HEAD", &output)),
        }
    }

    /// Run git and capture its output, whatever the exit status.
    async fn run(&self, args: &[&str], timeout: Duration) -> Result<GitOutput> {
        let command = format!("git {}", args.join(" "));
        debug!(repo = %self.repo.display(), "Running {command}");

        let child = Command::new("git")
            .args(args)
            .current_dir(&self.repo)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(timeout, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => return Err(VcsError::Spawn { command, source }),
            Err(_) => {
                warn!("{command} timed out after {}s", timeout.as_secs());
                return Err(VcsError::Timeout {
                    command,
                    timeout_secs: timeout.as_secs(),
                });
            }
        };

        Ok(GitOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Run git and return stdout, failing on a non-zero exit.
    async fn run_checked(&self, args: &[&str], timeout: Duration) -> Result<String> {
        let output = self.run(args, timeout).await?;
        if output.success() {
            Ok(output.stdout)
        } else {
            Err(failed(&format!("git {}", args.join(" ")), &output))
        }
    }
}

fn failed(command: &str, output: &GitOutput) -> VcsError {
    VcsError::CommandFailed {
        command: command.to_string(),
        status: output.status_text(),
        stderr: output.stderr.trim().to_string(),
    }
}

#[async_trait]
impl Vcs for GitCli {
    async fn status(&self) -> Result<Vec<StatusEntry>> {
        let stdout = self
            .run_checked(
                &["status", "--porcelain", "-z", "--untracked-files=all"],
                self.timeout,
            )
            .await?;
        Ok(parse_porcelain(&stdout))
    }

    async fn diff(&self, entries: &[StatusEntry]) -> Result<String> {
        let mut diff = if self.has_head().await? {
            self.run_checked(
                &["diff", "--no-color", "--no-ext-diff", "HEAD", "--"],
                self.timeout,
            )
            .await?
        } else {
            // Unborn branch: staged content against the empty tree, then
            // whatever the work tree changed on top of it.
            let mut staged = self
                .run_checked(
                    &["diff", "--no-color", "--no-ext-diff", "--cached", "--"],
                    self.timeout,
                )
                .await?;
            staged.push_str(
                &self
                    .run_checked(&["diff", "--no-color", "--no-ext-diff", "--"], self.timeout)
                    .await?,
            );
            staged
        };

        for entry in entries.iter().filter(|e| e.is_untracked()) {
            let args = [
                "diff",
                "--no-color",
                "--no-ext-diff",
                "--no-index",
                "--",
                "/dev/null",
                entry.path.as_str(),
            ];
            let output = self.run(&args, self.timeout).await?;
            // --no-index exits 1 when the inputs differ.
            match output.code {
                Some(0) | Some(1) => diff.push_str(&output.stdout),
                _ => return Err(failed(&format!("git {}", args.join(" ")), &output)),
            }
        }

        Ok(diff)
    }

    async fn commit_all(&self, message: &str) -> Result<()> {
        self.run_checked(&["add", "-A"], self.timeout).await?;

        let output = self.run(&["commit", "-m", message], self.timeout).await?;
        if output.success() {
            return Ok(());
        }
        if output.stdout.contains("nothing to commit") || output.stderr.contains("nothing to commit")
        {
            return Err(VcsError::NothingToCommit);
        }
        Err(failed("git commit", &output))
    }

    async fn push(&self) -> Result<()> {
        self.run_checked(&["push", self.remote.as_str(), "HEAD"], self.push_timeout)
            .await?;
        Ok(())
    }
}

/// Parse `git status --porcelain -z` output.
///
/// Entries keep git's order. Renames and copies carry their source path in
/// the following NUL-separated field.
pub fn parse_porcelain(output: &str) -> Vec<StatusEntry> {
    let mut entries = Vec::new();
    let mut fields = output.split('\0').filter(|f| !f.is_empty());

    while let Some(field) = fields.next() {
        let mut status = field.chars();
        let (Some(index), Some(worktree), Some(path)) =
            (status.next(), status.next(), field.get(3..))
        else {
            continue;
        };
        if path.is_empty() {
            continue;
        }

        let orig_path = if matches!(index, 'R' | 'C') || matches!(worktree, 'R' | 'C') {
            fields.next().map(str::to_string)
        } else {
            None
        };

        entries.push(StatusEntry {
            index,
            worktree,
            path: path.to_string(),
            orig_path,
        });
    }

    entries
}
