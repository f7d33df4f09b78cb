//! # Directory Watcher
//!
//! Change detection for the gitwatch pipeline. It watches a repository's
//! working tree and turns raw file system notifications into settle signals.
//!
//! ## Features
//!
//! - **Recursive Watching**: Monitor the whole tree, including directories
//!   created after startup
//! - **Metadata Exclusion**: Changes under `.git` never surface, so the
//!   agent's own commits cannot retrigger it
//! - **Debouncing**: Bursts of events collapse into a single settle signal
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Directory Watcher                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  WatchConfig ──► ChangeSource ──► RawEvent ──► Debouncer       │
//! │       │                                            │            │
//! │       ▼                                            ▼            │
//! │  ExcludePatterns                             SettleSignal       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod debounce;
pub mod error;
pub mod event;
pub mod watcher;

pub use config::WatchConfig;
pub use debounce::{DEFAULT_QUIET_INTERVAL, Debouncer, SettleSignal};
pub use error::{Result, WatcherError};
pub use event::{RawEvent, RawEventKind};
pub use watcher::{ChangeSource, EventReceiver};
