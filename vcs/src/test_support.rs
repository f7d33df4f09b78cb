use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Result, VcsError};
use crate::git::{StatusEntry, Vcs};

/// Scripted [`Vcs`] that records the calls made to it.
pub(crate) struct FakeVcs {
    entries: Vec<StatusEntry>,
    diff: String,
    fail_status: bool,
    fail_commit: bool,
    fail_push: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeVcs {
    pub(crate) fn clean() -> Self {
        Self::with_changes(&[], "")
    }

    pub(crate) fn with_changes(paths: &[&str], diff: &str) -> Self {
        Self {
            entries: paths
                .iter()
                .map(|p| StatusEntry {
                    index: ' ',
                    worktree: 'M',
                    path: p.to_string(),
                    orig_path: None,
                })
                .collect(),
            diff: diff.to_string(),
            fail_status: false,
            fail_commit: false,
            fail_push: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing_status(mut self) -> Self {
        self.fail_status = true;
        self
    }

    pub(crate) fn failing_commit(mut self) -> Self {
        self.fail_commit = true;
        self
    }

    pub(crate) fn failing_push(mut self) -> Self {
        self.fail_push = true;
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

fn scripted_failure(command: &str) -> VcsError {
    VcsError::CommandFailed {
        command: command.to_string(),
        status: "exit 128".to_string(),
        stderr: "fatal: scripted failure".to_string(),
    }
}

#[async_trait]
impl Vcs for FakeVcs {
    async fn status(&self) -> Result<Vec<StatusEntry>> {
        self.record("status");
        if self.fail_status {
            return Err(scripted_failure("git status"));
        }
        Ok(self.entries.clone())
    }

    async fn diff(&self, _entries: &[StatusEntry]) -> Result<String> {
        self.record("diff");
        Ok(self.diff.clone())
    }

    async fn commit_all(&self, message: &str) -> Result<()> {
        self.record(format!("commit_all:{message}"));
        if self.fail_commit {
            return Err(scripted_failure("git commit"));
        }
        Ok(())
    }

    async fn push(&self) -> Result<()> {
        self.record("push");
        if self.fail_push {
            return Err(scripted_failure("git push"));
        }
        Ok(())
    }
}
