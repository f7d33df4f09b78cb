//! Commit and push driver.

use std::sync::Arc;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::PublishError;
use crate::git::Vcs;
use crate::snapshot::ChangeSet;

/// Source of the commit timestamp.
pub type Clock = Arc<dyn Fn() -> DateTime<Local> + Send + Sync>;

/// Outcome of one publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Commit message used.
    pub message: String,

    /// Local time the commit was made.
    pub committed_at: DateTime<Local>,

    /// Whether the push reached the remote. The local commit exists either
    /// way.
    pub pushed: bool,
}

/// Format the commit message for a commit made at `at`.
pub fn commit_message(at: &DateTime<Local>) -> String {
    format!("Auto-commit: {}", at.format("%Y-%m-%d %H:%M:%S"))
}

/// Stages, commits and pushes change sets.
pub struct Publisher {
    vcs: Arc<dyn Vcs>,
    clock: Clock,
}

impl Publisher {
    /// Create a publisher using the wall clock.
    pub fn new(vcs: Arc<dyn Vcs>) -> Self {
        Self {
            vcs,
            clock: Arc::new(Local::now),
        }
    }

    /// Use a different clock for commit timestamps.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Commit everything in the working tree and push it.
    ///
    /// Staging and committing are one failure domain and abort the publish.
    /// Pushing is another: a failed push is logged and reported through
    /// [`CommitRecord::pushed`], and the local commit is kept. There is no
    /// push retry.
    pub async fn publish(&self, change_set: &ChangeSet) -> Result<CommitRecord, PublishError> {
        if !change_set.has_changes {
            return Err(PublishError::NothingToCommit);
        }

        let committed_at = (self.clock)();
        let message = commit_message(&committed_at);

        self.vcs.commit_all(&message).await?;
        info!(
            files = change_set.paths_changed.len(),
            "Committed: {message}"
        );

        let pushed = match self.vcs.push().await {
            Ok(()) => {
                info!("Pushed");
                true
            }
            Err(e) => {
                error!(error = %e, "Push failed; local commit kept");
                false
            }
        };

        Ok(CommitRecord {
            message,
            committed_at,
            pushed,
        })
    }
}
