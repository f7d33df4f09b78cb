//! Change source implementation.

use std::path::{Path, PathBuf};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::config::{ExcludeMatcher, WatchConfig};
use crate::error::{Result, WatcherError};
use crate::event::{RawEvent, RawEventKind};

/// Receiving end of a change source.
///
/// Yields raw events for as long as the [`ChangeSource`] is alive. An `Err`
/// item means the watch is lost and the stream cannot be resumed.
pub type EventReceiver = mpsc::UnboundedReceiver<Result<RawEvent>>;

/// Recursive watch over a repository working tree.
///
/// The notify backend delivers events on its own thread; they are bridged
/// into an unbounded channel so the backend thread never blocks on the
/// consumer. Dropping the source stops the watch and closes the channel.
pub struct ChangeSource {
    /// Canonical watch root.
    root: PathBuf,

    /// Internal notify watcher, kept alive for the lifetime of the source.
    _watcher: RecommendedWatcher,
}

impl ChangeSource {
    /// Start watching the configured root.
    ///
    /// The returned receiver is infinite and not restartable.
    pub fn observe(config: WatchConfig) -> Result<(Self, EventReceiver)> {
        if !config.root.exists() {
            return Err(WatcherError::DirectoryNotFound(
                config.root.display().to_string(),
            ));
        }
        if !config.root.is_dir() {
            return Err(WatcherError::NotADirectory(
                config.root.display().to_string(),
            ));
        }

        // Backends report canonical paths (e.g. /private/var on macOS).
        let root = config.root.canonicalize()?;
        let matcher = WatchConfig {
            root: root.clone(),
            ..config
        }
        .matcher();

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let watched_root = root.clone();

        let mut watcher = notify::recommended_watcher(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) => forward(&event, &watched_root, &matcher, &event_tx),
                Err(e) => {
                    error!("Watch error: {e}");
                    let _ = event_tx.send(Err(WatcherError::Notify(e)));
                }
            },
        )?;

        watcher.watch(&root, RecursiveMode::Recursive)?;
        info!(root = %root.display(), "Change source started");

        Ok((
            Self {
                root,
                _watcher: watcher,
            },
            event_rx,
        ))
    }

    /// The canonical root being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Translate one notify event into raw events on the channel.
fn forward(
    event: &notify::Event,
    root: &Path,
    matcher: &ExcludeMatcher,
    tx: &mpsc::UnboundedSender<Result<RawEvent>>,
) {
    let Some(kind) = RawEventKind::from_notify(event.kind) else {
        return;
    };

    for path in &event.paths {
        if path == root
            && matches!(kind, RawEventKind::Deleted | RawEventKind::Moved)
            && !root.exists()
        {
            error!(root = %root.display(), "Watched directory disappeared");
            let _ = tx.send(Err(WatcherError::RootRemoved(root.display().to_string())));
            return;
        }

        if matcher.should_exclude(path) {
            continue;
        }

        debug!(?kind, path = %path.display(), "Raw event");
        if tx.send(Ok(RawEvent::new(kind, path))).is_err() {
            debug!("Event receiver dropped");
            return;
        }
    }
}
