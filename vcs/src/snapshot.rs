//! Working tree snapshots.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::git::Vcs;

/// What changed in the working tree since the last commit.
///
/// Computed fresh for every run and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Whether the working tree differs from the last commit.
    pub has_changes: bool,

    /// Changed paths in the order git reported them.
    pub paths_changed: Vec<String>,

    /// Unified diff of the change.
    pub unified_diff: String,
}

impl ChangeSet {
    /// A change set for an unchanged tree.
    pub fn unchanged() -> Self {
        Self::default()
    }
}

/// Computes [`ChangeSet`]s from the live repository.
pub struct Snapshotter {
    vcs: Arc<dyn Vcs>,
}

impl Snapshotter {
    /// Create a snapshotter over a version control collaborator.
    pub fn new(vcs: Arc<dyn Vcs>) -> Self {
        Self { vcs }
    }

    /// Take a snapshot of the working tree.
    ///
    /// An empty status short-circuits: no diff is computed. The path list
    /// and the diff come from the same status query so they cannot disagree.
    pub async fn snapshot(&self) -> Result<ChangeSet> {
        let entries = self.vcs.status().await?;
        if entries.is_empty() {
            debug!("Working tree clean");
            return Ok(ChangeSet::unchanged());
        }

        let unified_diff = self.vcs.diff(&entries).await?;
        let paths_changed = entries.into_iter().map(|e| e.path).collect();

        Ok(ChangeSet {
            has_changes: true,
            paths_changed,
            unified_diff,
        })
    }
}
