//! Run coordination.
//!
//! The [`Coordinator`] owns the debounce timer and the run gate. Raw events
//! rearm the timer; when it fires, a run is admitted through the gate. Each run
//! executes on its own task so events keep being absorbed while git and the
//! chat transport are busy.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use gitwatch_directory_watcher::{DEFAULT_QUIET_INTERVAL, Debouncer, EventReceiver, RawEvent};
use gitwatch_notifier::{DeliveryReport, Notifier, TelegramTransport};
use gitwatch_vcs::{Clock, CommitRecord, GitCli, PublishError, Publisher, Snapshotter, Vcs};

use crate::config::Config;
use crate::error::{PipelineError, Result};

/// Observable coordinator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelineState {
    /// Waiting for changes.
    Idle,
    /// Changes seen, waiting for them to settle.
    Debouncing,
    /// A run is in progress.
    Running,
}

/// How the gate answered a settle signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// No run was active; start one now.
    Start,
    /// A run is active; one more will follow it.
    Queued,
    /// A follow-up run is already queued; the signal is absorbed by it.
    Dropped,
}

/// At most one active run plus at most one queued run.
#[derive(Debug, Default)]
pub struct RunGate {
    running: bool,
    pending: bool,
}

impl RunGate {
    /// Create an idle gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a settle signal.
    pub fn admit(&mut self) -> Admission {
        if !self.running {
            self.running = true;
            Admission::Start
        } else if !self.pending {
            self.pending = true;
            Admission::Queued
        } else {
            Admission::Dropped
        }
    }

    /// Register the end of the active run. Returns true when the queued run
    /// should start now; the gate stays in the running state in that case.
    pub fn finish(&mut self) -> bool {
        if self.pending {
            self.pending = false;
            true
        } else {
            self.running = false;
            false
        }
    }

    /// Whether a run is active.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Whether a follow-up run is queued.
    pub fn is_pending(&self) -> bool {
        self.pending
    }
}

/// What one run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The working tree matched the last commit.
    NoChanges,
    /// Reading the working tree failed.
    SnapshotFailed(String),
    /// Staging or committing failed; nothing was sent.
    CommitFailed(String),
    /// A commit was made and the diff was sent.
    Completed {
        /// Paths in the commit, in git's order.
        paths: Vec<String>,
        /// Commit and push result.
        record: CommitRecord,
        /// Chat delivery result.
        report: DeliveryReport,
    },
}

/// One snapshot, publish and notify cycle.
pub struct Pipeline {
    snapshotter: Snapshotter,
    publisher: Publisher,
    notifier: Notifier,
}

impl Pipeline {
    /// Build a pipeline over `vcs` that reports through `notifier`.
    pub fn new(vcs: Arc<dyn Vcs>, notifier: Notifier) -> Self {
        Self {
            snapshotter: Snapshotter::new(vcs.clone()),
            publisher: Publisher::new(vcs),
            notifier,
        }
    }

    /// Build the production pipeline: git on the watched directory, Telegram
    /// for delivery.
    pub fn from_config(config: &Config) -> Self {
        let vcs = GitCli::new(config.watched_dir.clone())
            .with_remote(config.remote.clone())
            .with_timeout(config.git_timeout())
            .with_push_timeout(config.push_timeout());
        let transport = TelegramTransport::new(config.bot_token.clone(), config.chat_id.clone())
            .with_timeout(config.send_timeout());
        let notifier = Notifier::new(Arc::new(transport)).with_max_chunk(config.max_chunk);
        Self::new(Arc::new(vcs), notifier)
    }

    /// Use a different clock for commit timestamps.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.publisher = self.publisher.with_clock(clock);
        self
    }

    /// Execute one run.
    ///
    /// A clean tree ends the run before anything is committed or sent. A
    /// commit failure ends it before notifying. A push failure does not: the
    /// diff is still delivered and the record shows `pushed: false`.
    pub async fn run_once(&self) -> RunOutcome {
        let change_set = match self.snapshotter.snapshot().await {
            Ok(change_set) => change_set,
            Err(e) => {
                error!(error = %e, "Snapshot failed");
                return RunOutcome::SnapshotFailed(e.to_string());
            }
        };

        if !change_set.has_changes {
            debug!("No changes to commit");
            return RunOutcome::NoChanges;
        }

        let record = match self.publisher.publish(&change_set).await {
            Ok(record) => record,
            Err(PublishError::NothingToCommit) => {
                debug!("Changes vanished before commit");
                return RunOutcome::NoChanges;
            }
            Err(e) => {
                error!(error = %e, "Commit failed");
                return RunOutcome::CommitFailed(e.to_string());
            }
        };

        let report = self.notifier.notify(&change_set.unified_diff).await;

        RunOutcome::Completed {
            paths: change_set.paths_changed,
            record,
            report,
        }
    }
}

/// Drives runs from change events or a polling timer.
pub struct Coordinator {
    /// Shared with run tasks.
    pipeline: Arc<Pipeline>,

    /// Quiet-interval timer.
    debouncer: Debouncer,

    /// Active and queued run bookkeeping.
    gate: RunGate,

    /// Fixed-period trigger used instead of (or alongside) events.
    poll_interval: Option<Duration>,

    /// Admit one run immediately on start.
    run_on_start: bool,

    /// Receives every run outcome.
    outcomes: Option<mpsc::UnboundedSender<RunOutcome>>,
}

impl Coordinator {
    /// Create a coordinator with the default quiet interval.
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            debouncer: Debouncer::new(DEFAULT_QUIET_INTERVAL),
            gate: RunGate::new(),
            poll_interval: None,
            run_on_start: false,
            outcomes: None,
        }
    }

    /// Create a coordinator with timing taken from `config`.
    pub fn from_config(pipeline: Pipeline, config: &Config) -> Self {
        let coordinator = Self::new(pipeline)
            .with_quiet_interval(config.debounce())
            .with_startup_run(config.run_on_start);
        if config.use_polling {
            coordinator.with_polling(config.poll_interval())
        } else if let Some(backup) = config.backup_interval() {
            // Catches changes whose events the watcher lost.
            coordinator.with_polling(backup)
        } else {
            coordinator
        }
    }

    /// Set the debounce quiet interval.
    pub fn with_quiet_interval(mut self, quiet: Duration) -> Self {
        self.debouncer = Debouncer::new(quiet);
        self
    }

    /// Also trigger a run every `period`.
    ///
    /// Ticks go through the same admission as settle signals, so they only
    /// add a run when none is active or queued.
    pub fn with_polling(mut self, period: Duration) -> Self {
        self.poll_interval = Some(period);
        self
    }

    /// Start with one run, to pick up changes made while the agent was down.
    pub fn with_startup_run(mut self, enabled: bool) -> Self {
        self.run_on_start = enabled;
        self
    }

    /// Receive the outcome of every run.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<RunOutcome> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.outcomes = Some(tx);
        rx
    }

    /// Current state.
    pub fn state(&self) -> PipelineState {
        if self.gate.is_running() {
            PipelineState::Running
        } else if self.debouncer.is_armed() {
            PipelineState::Debouncing
        } else {
            PipelineState::Idle
        }
    }

    /// Run until `shutdown` resolves or the change source fails.
    ///
    /// `events` is `None` in polling mode. On shutdown no further runs are
    /// admitted and an active run is awaited before returning. A queued run
    /// is abandoned. An error from the change source is fatal.
    pub async fn run<S>(mut self, events: Option<EventReceiver>, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut events = events;
        let mut active: Option<JoinHandle<RunOutcome>> = None;
        let mut ticker = self.poll_interval.map(|period| {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        info!(
            quiet_ms = self.debouncer.quiet_interval().as_millis() as u64,
            polling = ?self.poll_interval,
            "Coordinator started"
        );

        if self.run_on_start {
            info!("Startup run");
            self.on_settle(&mut active);
        }

        let fatal = loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break None;
                }
                item = next_event(&mut events) => match item {
                    Some(Ok(event)) => self.on_event(&event),
                    Some(Err(e)) => {
                        error!(error = %e, "Change source failed");
                        break Some(e);
                    }
                    None => {
                        warn!("Change source closed");
                        events = None;
                    }
                },
                _ = self.debouncer.settled() => {
                    debug!("Changes settled");
                    self.on_settle(&mut active);
                }
                _ = tick(&mut ticker) => {
                    debug!("Poll tick");
                    self.on_settle(&mut active);
                }
                result = join_active(&mut active) => {
                    active = None;
                    self.on_finished(result);
                    if self.gate.finish() {
                        info!("Starting queued run");
                        active = Some(self.spawn_run());
                    }
                }
            }
        };

        if let Some(handle) = active.take() {
            info!("Waiting for the active run to finish");
            self.on_finished(handle.await);
        }
        if self.gate.is_pending() {
            debug!("Queued run abandoned");
        }

        match fatal {
            Some(e) => Err(PipelineError::WatchFatal(e)),
            None => {
                info!("Coordinator stopped");
                Ok(())
            }
        }
    }

    fn on_event(&mut self, event: &RawEvent) {
        debug!(path = %event.path.display(), kind = ?event.kind, "Change observed");
        self.debouncer.observe(event);
    }

    fn on_settle(&mut self, active: &mut Option<JoinHandle<RunOutcome>>) {
        match self.gate.admit() {
            Admission::Start => *active = Some(self.spawn_run()),
            Admission::Queued => debug!("Run in progress, queued a follow-up run"),
            Admission::Dropped => debug!("Follow-up run already queued, signal absorbed"),
        }
    }

    fn spawn_run(&self) -> JoinHandle<RunOutcome> {
        let pipeline = self.pipeline.clone();
        tokio::spawn(async move { pipeline.run_once().await })
    }

    fn on_finished(&self, result: std::result::Result<RunOutcome, JoinError>) {
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Run task failed");
                return;
            }
        };

        match &outcome {
            RunOutcome::NoChanges => debug!("Run finished: no changes"),
            RunOutcome::SnapshotFailed(_) | RunOutcome::CommitFailed(_) => {
                warn!("Run finished without a commit")
            }
            RunOutcome::Completed {
                paths,
                record,
                report,
            } => info!(
                files = paths.len(),
                pushed = record.pushed,
                delivered = report.delivered,
                chunks = report.chunks,
                "Run finished: {}",
                record.message
            ),
        }

        if let Some(tx) = &self.outcomes {
            let _ = tx.send(outcome);
        }
    }
}

async fn next_event(
    events: &mut Option<EventReceiver>,
) -> Option<gitwatch_directory_watcher::Result<RawEvent>> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn join_active(
    active: &mut Option<JoinHandle<RunOutcome>>,
) -> std::result::Result<RunOutcome, JoinError> {
    match active {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_gate_serializes_runs() {
        let mut gate = RunGate::new();

        assert_eq!(gate.admit(), Admission::Start);
        assert_eq!(gate.admit(), Admission::Queued);
        assert_eq!(gate.admit(), Admission::Dropped);
        assert_eq!(gate.admit(), Admission::Dropped);

        // The queued run takes over directly.
        assert!(gate.finish());
        assert!(gate.is_running());
        assert!(!gate.is_pending());

        assert_eq!(gate.admit(), Admission::Queued);
        assert!(gate.finish());
        assert!(!gate.finish());
        assert!(!gate.is_running());
    }

    struct CleanVcs;

    #[async_trait::async_trait]
    impl Vcs for CleanVcs {
        async fn status(&self) -> gitwatch_vcs::Result<Vec<gitwatch_vcs::StatusEntry>> {
            Ok(Vec::new())
        }

        async fn diff(&self, _entries: &[gitwatch_vcs::StatusEntry]) -> gitwatch_vcs::Result<String> {
            Ok(String::new())
        }

        async fn commit_all(&self, _message: &str) -> gitwatch_vcs::Result<()> {
            Ok(())
        }

        async fn push(&self) -> gitwatch_vcs::Result<()> {
            Ok(())
        }
    }

    fn coordinator() -> Coordinator {
        let transport = TelegramTransport::new("1:x", "1");
        let pipeline = Pipeline::new(Arc::new(CleanVcs), Notifier::new(Arc::new(transport)));
        Coordinator::new(pipeline)
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_follows_timer_and_gate() {
        let mut coordinator = coordinator();
        assert_eq!(coordinator.state(), PipelineState::Idle);

        coordinator.on_event(&RawEvent::new(
            gitwatch_directory_watcher::RawEventKind::Modified,
            "a.txt",
        ));
        assert_eq!(coordinator.state(), PipelineState::Debouncing);

        coordinator.debouncer.settled().await;
        assert_eq!(coordinator.state(), PipelineState::Idle);

        let mut active = None;
        coordinator.on_settle(&mut active);
        assert_eq!(coordinator.state(), PipelineState::Running);

        let outcome = active.take().unwrap().await.unwrap();
        assert_eq!(outcome, RunOutcome::NoChanges);
        assert!(!coordinator.gate.finish());
        assert_eq!(coordinator.state(), PipelineState::Idle);
    }

    #[test]
    fn test_gate_idle_after_single_run() {
        let mut gate = RunGate::new();
        assert_eq!(gate.admit(), Admission::Start);
        assert!(!gate.finish());
        assert_eq!(gate.admit(), Admission::Start);
    }
}
