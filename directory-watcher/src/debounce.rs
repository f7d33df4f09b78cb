//! Quiet-period debouncing of raw events.
//!
//! A single rearmable timer: every raw event pushes the deadline out to
//! `now + quiet`, and only the timer firing produces a [`SettleSignal`]. A
//! burst of any length therefore collapses into exactly one signal once the
//! tree has been quiet for the full interval. Events that keep arriving with
//! gaps shorter than the interval postpone the signal indefinitely.

use std::future;
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, Sleep};
use tracing::{debug, trace};

use crate::event::RawEvent;

/// Default quiet interval.
pub const DEFAULT_QUIET_INTERVAL: Duration = Duration::from_secs(2);

/// "The tree has been quiet for the debounce interval."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleSignal;

/// Resettable quiet-period timer.
#[derive(Debug)]
pub struct Debouncer {
    /// Quiet interval.
    quiet: Duration,

    /// Pending timer; `None` while disarmed.
    timer: Option<Pin<Box<Sleep>>>,
}

impl Debouncer {
    /// Create a disarmed debouncer.
    pub fn new(quiet: Duration) -> Self {
        Self { quiet, timer: None }
    }

    /// The configured quiet interval.
    pub fn quiet_interval(&self) -> Duration {
        self.quiet
    }

    /// Whether a timer is pending.
    pub fn is_armed(&self) -> bool {
        self.timer.is_some()
    }

    /// When the pending timer will fire, if armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.timer.as_ref().map(|t| t.deadline())
    }

    /// Record a raw event, (re)arming the timer.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn observe(&mut self, event: &RawEvent) {
        let deadline = Instant::now() + self.quiet;
        match self.timer.as_mut() {
            Some(timer) => timer.as_mut().reset(deadline),
            None => self.timer = Some(Box::pin(tokio::time::sleep_until(deadline))),
        }
        trace!(path = %event.path.display(), "Debounce timer armed");
    }

    /// Wait for the pending timer to fire.
    ///
    /// Never completes while disarmed. Cancel safe: dropping the future
    /// leaves the timer armed.
    pub async fn settled(&mut self) -> SettleSignal {
        match self.timer.as_mut() {
            Some(timer) => {
                timer.as_mut().await;
                self.timer = None;
                SettleSignal
            }
            None => future::pending().await,
        }
    }

    /// Run as a standalone stage between a raw event channel and a signal
    /// channel.
    ///
    /// Returns when either channel closes. A timer still pending when the
    /// event channel closes is dropped without emitting.
    pub async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<RawEvent>,
        signals: mpsc::UnboundedSender<SettleSignal>,
    ) {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.observe(&event),
                    None => break,
                },
                signal = self.settled() => {
                    debug!("Tree settled");
                    if signals.send(signal).is_err() {
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::RawEventKind;
    use pretty_assertions::assert_eq;

    const QUIET: Duration = Duration::from_secs(2);

    fn event() -> RawEvent {
        RawEvent::new(RawEventKind::Modified, "/repo/a.txt")
    }

    fn spawn_stage() -> (
        mpsc::UnboundedSender<RawEvent>,
        mpsc::UnboundedReceiver<SettleSignal>,
    ) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        tokio::spawn(Debouncer::new(QUIET).run(event_rx, signal_tx));
        (event_tx, signal_rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_wait_keeps_timer_armed() {
        let mut debouncer = Debouncer::new(QUIET);
        {
            let mut settled = tokio_test::task::spawn(debouncer.settled());
            tokio_test::assert_pending!(settled.poll());
        }

        debouncer.observe(&event());
        let deadline = debouncer.deadline();
        {
            let mut settled = tokio_test::task::spawn(debouncer.settled());
            tokio_test::assert_pending!(settled.poll());
        }
        assert!(debouncer.is_armed());
        assert_eq!(debouncer.deadline(), deadline);

        let start = Instant::now();
        debouncer.settled().await;
        assert_eq!(start.elapsed(), QUIET);
        assert!(!debouncer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarmed_by_default() {
        let debouncer = Debouncer::new(QUIET);
        assert!(!debouncer.is_armed());
        assert_eq!(debouncer.deadline(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_observe_rearms_deadline() {
        let mut debouncer = Debouncer::new(QUIET);
        let start = Instant::now();

        debouncer.observe(&event());
        assert_eq!(debouncer.deadline(), Some(start + QUIET));

        tokio::time::advance(Duration::from_millis(1500)).await;
        debouncer.observe(&event());
        assert_eq!(
            debouncer.deadline(),
            Some(start + Duration::from_millis(1500) + QUIET)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_collapses_into_one_signal() {
        let (event_tx, mut signal_rx) = spawn_stage();
        let start = Instant::now();

        for _ in 0..10 {
            event_tx.send(event()).unwrap();
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        // Last event was sent at start + 4.5s.
        let last_event = start + Duration::from_millis(4500);

        assert_eq!(signal_rx.recv().await, Some(SettleSignal));
        assert_eq!(Instant::now(), last_event + QUIET);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(signal_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_separated_events_produce_separate_signals() {
        let (event_tx, mut signal_rx) = spawn_stage();

        event_tx.send(event()).unwrap();
        tokio::time::sleep(Duration::from_millis(2500)).await;
        event_tx.send(event()).unwrap();
        tokio::time::sleep(Duration::from_millis(2500)).await;

        assert_eq!(signal_rx.try_recv(), Ok(SettleSignal));
        assert_eq!(signal_rx.try_recv(), Ok(SettleSignal));
        assert!(signal_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_continuous_events_starve_signal() {
        let (event_tx, mut signal_rx) = spawn_stage();

        for _ in 0..20 {
            event_tx.send(event()).unwrap();
            tokio::time::sleep(Duration::from_millis(1900)).await;
        }

        assert!(signal_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_signal_without_events() {
        let (_event_tx, mut signal_rx) = spawn_stage();

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(signal_rx.try_recv().is_err());
    }
}
