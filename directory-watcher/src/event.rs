//! Raw file events from directory watching.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A raw file system mutation observed under the watch root.
///
/// Raw events are transient: they only exist to (re)arm the debouncer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    /// Path to the affected file or directory.
    pub path: PathBuf,

    /// The kind of event.
    pub kind: RawEventKind,

    /// When the event was observed.
    pub observed_at: DateTime<Utc>,
}

impl RawEvent {
    /// Create a new raw event observed now.
    pub fn new(kind: RawEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind,
            observed_at: Utc::now(),
        }
    }
}

/// Kind of raw event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawEventKind {
    /// File or directory was created.
    Created,

    /// Content or metadata changed.
    Modified,

    /// File or directory was deleted.
    Deleted,

    /// File or directory was renamed (either side of the rename).
    Moved,
}

impl RawEventKind {
    /// Map a notify event kind onto a mutation kind.
    ///
    /// Returns `None` for access notifications (open, read, close), which do
    /// not change the tree. Reading files is exactly what `git status` and
    /// `git diff` do, so surfacing these would feed back into the pipeline.
    pub fn from_notify(kind: notify::EventKind) -> Option<Self> {
        use notify::EventKind;
        use notify::event::ModifyKind;

        match kind {
            EventKind::Access(_) => None,
            EventKind::Create(_) => Some(Self::Created),
            EventKind::Remove(_) => Some(Self::Deleted),
            EventKind::Modify(ModifyKind::Name(_)) => Some(Self::Moved),
            EventKind::Modify(_) => Some(Self::Modified),
            _ => Some(Self::Modified),
        }
    }
}
