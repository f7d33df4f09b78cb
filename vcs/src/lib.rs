//! # Version Control
//!
//! The git side of the gitwatch pipeline: deciding whether the working tree
//! changed, describing the change, and recording it.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Version Control                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  Vcs (GitCli) ──► Snapshotter ──► ChangeSet                    │
//! │       │                               │                         │
//! │       ▼                               ▼                         │
//! │  status/diff/commit/push         Publisher ──► CommitRecord    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All git access goes through the [`Vcs`] trait so the pipeline can be
//! exercised without a repository.

pub mod error;
pub mod git;
pub mod publish;
pub mod snapshot;

#[cfg(test)]
mod test_support;

pub use error::{PublishError, Result, VcsError};
pub use git::{GitCli, StatusEntry, Vcs};
pub use publish::{Clock, CommitRecord, Publisher, commit_message};
pub use snapshot::{ChangeSet, Snapshotter};
