//! # Pipeline
//!
//! Turns change events into commits and chat notifications, one run at a
//! time.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Coordinator                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  RawEvent ──► Debouncer ──► RunGate ──► Pipeline (spawned)     │
//! │  poll tick ───────────────────┘            │                    │
//! │                                            ▼                    │
//! │                       Snapshotter ──► Publisher ──► Notifier    │
//! │                                                                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! States are `Idle → Debouncing → Running → Idle`. A settle signal during a
//! run queues exactly one follow-up run; further signals are absorbed by it.

pub mod config;
pub mod coordinator;
pub mod error;

pub use config::{ChatTarget, Config, LogLevel, state_dir};
pub use coordinator::{Admission, Coordinator, Pipeline, PipelineState, RunGate, RunOutcome};
pub use error::{ConfigError, PipelineError, Result};
