//! Scripted collaborators shared by the pipeline tests.

#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Local, TimeZone};
use tokio::sync::Semaphore;

use gitwatch_notifier::{ChatTransport, NotifyError};
use gitwatch_vcs::{Clock, StatusEntry, Vcs, VcsError};

/// A [`Vcs`] that reports a fixed set of changes.
///
/// When built with [`ScriptedVcs::gated`], every `status` call waits for a
/// permit from [`ScriptedVcs::release`], holding the run in progress.
/// The `*_once` switches make only the next matching call fail.
pub struct ScriptedVcs {
    paths: Vec<String>,
    diff: String,
    fail_push: bool,
    fail_status: AtomicBool,
    fail_commit: AtomicBool,
    gate: Option<Semaphore>,
    status_calls: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

impl ScriptedVcs {
    pub fn clean() -> Self {
        Self::with_changes(&[], "")
    }

    pub fn with_changes(paths: &[&str], diff: &str) -> Self {
        Self {
            paths: paths.iter().map(|p| p.to_string()).collect(),
            diff: diff.to_string(),
            fail_push: false,
            fail_status: AtomicBool::new(false),
            fail_commit: AtomicBool::new(false),
            gate: None,
            status_calls: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    pub fn failing_push(mut self) -> Self {
        self.fail_push = true;
        self
    }

    pub fn failing_status_once(self) -> Self {
        self.fail_status.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_commit_once(self) -> Self {
        self.fail_commit.store(true, Ordering::SeqCst);
        self
    }

    /// Let one blocked `status` call proceed.
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

#[async_trait]
impl Vcs for ScriptedVcs {
    async fn status(&self) -> gitwatch_vcs::Result<Vec<StatusEntry>> {
        self.record("status");
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        if self.fail_status.swap(false, Ordering::SeqCst) {
            return Err(VcsError::Timeout {
                command: "git status --porcelain -z --untracked-files=all".to_string(),
                timeout_secs: 30,
            });
        }
        Ok(self
            .paths
            .iter()
            .map(|path| StatusEntry {
                index: ' ',
                worktree: 'M',
                path: path.clone(),
                orig_path: None,
            })
            .collect())
    }

    async fn diff(&self, _entries: &[StatusEntry]) -> gitwatch_vcs::Result<String> {
        self.record("diff");
        Ok(self.diff.clone())
    }

    async fn commit_all(&self, message: &str) -> gitwatch_vcs::Result<()> {
        self.record(format!("commit_all:{message}"));
        if self.fail_commit.swap(false, Ordering::SeqCst) {
            return Err(VcsError::CommandFailed {
                command: "git commit".to_string(),
                status: "exit 1".to_string(),
                stderr: "fatal: unable to write new index file".to_string(),
            });
        }
        Ok(())
    }

    async fn push(&self) -> gitwatch_vcs::Result<()> {
        self.record("push");
        if self.fail_push {
            return Err(VcsError::CommandFailed {
                command: "git push origin HEAD".to_string(),
                status: "exit 128".to_string(),
                stderr: "fatal: could not read from remote repository".to_string(),
            });
        }
        Ok(())
    }
}

/// A [`ChatTransport`] that keeps every message it is given.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<String>>,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    fn name(&self) -> &str {
        "recording"
    }

    fn max_message_len(&self) -> usize {
        4096
    }

    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Clock pinned to 2024-01-15 10:30:00 local time.
pub fn fixed_clock() -> Clock {
    std::sync::Arc::new(|| Local.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap())
}
