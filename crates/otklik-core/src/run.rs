//! Run state machine and cumulative counters.
//!
//! # Status transitions
//!
//! ```text
//! Idle --[start]--> Running <--[resume/pause]--> Paused
//!                      |                            |
//!                      +---------[stop]-------------+--> Stopped (terminal)
//! ```
//!
//! All counters live behind one handle; the other engine components mutate
//! them only through the methods here, never directly. Pause is a
//! channel wait, not a polling loop: callers park in [`RunHandle::wait_if_paused`]
//! between atomic steps until the status changes.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::watch;

use crate::error::EngineError;
use crate::models::{RunStats, RunStatus, SubmissionOutcome};

#[derive(Debug)]
struct RunInner {
    page: u32,
    sent: u64,
    processed: u64,
    skipped: u64,
    errors: u64,
    consecutive_failures: u32,
    consecutive_duplicate_hits: u32,
    started: Option<Instant>,
    paused_accumulated: Duration,
    /// Start of the pause currently in progress, if any.
    pause_started: Option<Instant>,
}

impl RunInner {
    fn new() -> Self {
        Self {
            page: 0,
            sent: 0,
            processed: 0,
            skipped: 0,
            errors: 0,
            consecutive_failures: 0,
            consecutive_duplicate_hits: 0,
            started: None,
            paused_accumulated: Duration::ZERO,
            pause_started: None,
        }
    }
}

/// Shared handle to one run's status and counters.
#[derive(Clone)]
pub struct RunHandle {
    inner: Arc<Mutex<RunInner>>,
    status: watch::Sender<RunStatus>,
}

impl Default for RunHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl RunHandle {
    pub fn new() -> Self {
        let (status, _) = watch::channel(RunStatus::Idle);
        Self {
            inner: Arc::new(Mutex::new(RunInner::new())),
            status,
        }
    }

    /// Acquires the inner mutex lock, recovering from poison if necessary.
    fn lock_inner(&self) -> std::sync::MutexGuard<'_, RunInner> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Recovered from poisoned run-state mutex");
            poisoned.into_inner()
        })
    }

    pub fn status(&self) -> RunStatus {
        *self.status.borrow()
    }

    /// Idle → Running. Records the run start time.
    pub fn start(&self) -> Result<(), EngineError> {
        self.transition(RunStatus::Running)?;
        self.lock_inner().started = Some(Instant::now());
        Ok(())
    }

    /// Running → Paused. Marks the start of the pause so elapsed-time
    /// snapshots exclude it even while the pause is still in progress.
    pub fn pause(&self) -> Result<(), EngineError> {
        self.transition(RunStatus::Paused)?;
        self.lock_inner().pause_started = Some(Instant::now());
        Ok(())
    }

    /// Paused → Running.
    pub fn resume(&self) -> Result<(), EngineError> {
        let current = self.status();
        if current != RunStatus::Paused {
            return Err(EngineError::InvalidTransition {
                from: current,
                to: RunStatus::Running,
            });
        }
        self.transition(RunStatus::Running)?;
        self.end_pause();
        Ok(())
    }

    /// Running/Paused → Stopped. Idempotent: stopping a stopped run is a
    /// no-op, since both the engine and an external stop request may race
    /// to terminate the same run.
    pub fn stop(&self) -> Result<(), EngineError> {
        if self.status() == RunStatus::Stopped {
            return Ok(());
        }
        self.transition(RunStatus::Stopped)?;
        self.end_pause();
        Ok(())
    }

    /// Fold a finished pause into the accumulated total. No-op when no
    /// pause is in progress.
    fn end_pause(&self) {
        let mut inner = self.lock_inner();
        if let Some(pause_started) = inner.pause_started.take() {
            inner.paused_accumulated += pause_started.elapsed();
        }
    }

    fn transition(&self, to: RunStatus) -> Result<(), EngineError> {
        let mut result = Ok(());
        self.status.send_if_modified(|current| {
            let legal = matches!(
                (*current, to),
                (RunStatus::Idle, RunStatus::Running)
                    | (RunStatus::Running, RunStatus::Paused)
                    | (RunStatus::Paused, RunStatus::Running)
                    | (RunStatus::Running, RunStatus::Stopped)
                    | (RunStatus::Paused, RunStatus::Stopped)
            );
            if legal {
                tracing::debug!(from = %current, to = %to, "Run status transition");
                *current = to;
                true
            } else {
                result = Err(EngineError::InvalidTransition {
                    from: *current,
                    to,
                });
                false
            }
        });
        result
    }

    /// Park until the run is no longer paused. Returns the status observed
    /// on wake-up. Pause duration is accounted by the pause/resume/stop
    /// transitions, not here.
    pub async fn wait_if_paused(&self) -> RunStatus {
        let mut rx = self.status.subscribe();
        let mut current = *rx.borrow_and_update();
        while current == RunStatus::Paused {
            if rx.changed().await.is_err() {
                break;
            }
            current = *rx.borrow_and_update();
        }
        current
    }

    pub fn set_page(&self, page: u32) {
        self.lock_inner().page = page;
    }

    /// Fold one submission outcome into the counters.
    pub fn record_outcome(&self, outcome: &SubmissionOutcome) {
        let mut inner = self.lock_inner();
        inner.processed += 1;
        match outcome {
            SubmissionOutcome::Success => {
                inner.sent += 1;
                inner.consecutive_failures = 0;
                inner.consecutive_duplicate_hits = 0;
            }
            SubmissionOutcome::Skipped { .. } => {
                inner.skipped += 1;
            }
            SubmissionOutcome::Failed { .. } => {
                inner.errors += 1;
                inner.consecutive_failures += 1;
            }
            SubmissionOutcome::FatalStop { .. } => {
                inner.errors += 1;
            }
        }
    }

    /// Record a server-reported "already applied" and return the new streak
    /// length. The streak resets on the next successful submission.
    pub fn note_server_duplicate(&self) -> u32 {
        let mut inner = self.lock_inner();
        inner.consecutive_duplicate_hits += 1;
        inner.consecutive_duplicate_hits
    }

    pub fn sent(&self) -> u64 {
        self.lock_inner().sent
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.lock_inner().consecutive_failures
    }

    pub fn duplicate_hits(&self) -> u32 {
        self.lock_inner().consecutive_duplicate_hits
    }

    /// Snapshot of the counters for reporting. An in-progress pause is
    /// excluded from the elapsed time just like finished ones.
    pub fn stats(&self) -> RunStats {
        let inner = self.lock_inner();
        let paused = inner.paused_accumulated
            + inner
                .pause_started
                .map(|p| p.elapsed())
                .unwrap_or(Duration::ZERO);
        let elapsed_ms = inner
            .started
            .map(|s| s.elapsed().saturating_sub(paused))
            .unwrap_or(Duration::ZERO)
            .as_millis() as u64;
        RunStats {
            status: self.status(),
            page: inner.page,
            sent: inner.sent,
            processed: inner.processed,
            skipped: inner.skipped,
            errors: inner.errors,
            consecutive_failures: inner.consecutive_failures,
            consecutive_duplicate_hits: inner.consecutive_duplicate_hits,
            elapsed_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legal_transition_sequence() {
        let run = RunHandle::new();
        assert_eq!(run.status(), RunStatus::Idle);
        run.start().unwrap();
        assert_eq!(run.status(), RunStatus::Running);
        run.pause().unwrap();
        assert_eq!(run.status(), RunStatus::Paused);
        run.resume().unwrap();
        run.stop().unwrap();
        assert_eq!(run.status(), RunStatus::Stopped);
    }

    #[test]
    fn illegal_transitions_rejected() {
        let run = RunHandle::new();
        assert!(matches!(
            run.pause(),
            Err(EngineError::InvalidTransition { .. })
        ));
        assert!(matches!(
            run.resume(),
            Err(EngineError::InvalidTransition { .. })
        ));

        run.start().unwrap();
        assert!(run.start().is_err(), "Running -> Running is not an edge");

        run.stop().unwrap();
        assert!(run.start().is_err(), "Stopped is terminal");
        assert!(run.pause().is_err());
    }

    #[test]
    fn stop_is_idempotent() {
        let run = RunHandle::new();
        run.start().unwrap();
        run.stop().unwrap();
        run.stop().unwrap();
        assert_eq!(run.status(), RunStatus::Stopped);
    }

    #[test]
    fn stop_from_paused() {
        let run = RunHandle::new();
        run.start().unwrap();
        run.pause().unwrap();
        run.stop().unwrap();
        assert_eq!(run.status(), RunStatus::Stopped);
    }

    #[test]
    fn outcome_accounting() {
        let run = RunHandle::new();
        run.record_outcome(&SubmissionOutcome::Success);
        run.record_outcome(&SubmissionOutcome::skipped("duplicate"));
        run.record_outcome(&SubmissionOutcome::Failed {
            reason: "timeout".into(),
            retryable: false,
        });
        run.record_outcome(&SubmissionOutcome::Failed {
            reason: "timeout".into(),
            retryable: false,
        });

        let stats = run.stats();
        assert_eq!(stats.processed, 4);
        assert_eq!(stats.sent, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.errors, 2);
        assert_eq!(stats.consecutive_failures, 2);
        assert!(stats.sent <= stats.processed);

        run.record_outcome(&SubmissionOutcome::Success);
        assert_eq!(run.consecutive_failures(), 0);
    }

    #[test]
    fn duplicate_streak_resets_on_success() {
        let run = RunHandle::new();
        assert_eq!(run.note_server_duplicate(), 1);
        assert_eq!(run.note_server_duplicate(), 2);
        run.record_outcome(&SubmissionOutcome::Success);
        assert_eq!(run.duplicate_hits(), 0);
        assert_eq!(run.note_server_duplicate(), 1);
    }

    #[test]
    fn stats_exclude_an_ongoing_pause() {
        let run = RunHandle::new();
        run.start().unwrap();
        run.pause().unwrap();
        std::thread::sleep(Duration::from_millis(150));

        // Snapshot taken mid-pause must not count the pause so far.
        assert!(run.stats().elapsed_ms < 75);

        run.resume().unwrap();
        assert!(run.stats().elapsed_ms < 75);
    }

    #[tokio::test]
    async fn wait_if_paused_returns_immediately_when_running() {
        let run = RunHandle::new();
        run.start().unwrap();
        assert_eq!(run.wait_if_paused().await, RunStatus::Running);
    }

    #[tokio::test]
    async fn wait_if_paused_parks_until_resume() {
        let run = RunHandle::new();
        run.start().unwrap();
        run.pause().unwrap();

        let waiter = run.clone();
        let resumer = run.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            resumer.resume().unwrap();
        });

        let status = waiter.wait_if_paused().await;
        assert_eq!(status, RunStatus::Running);
        assert!(run.stats().elapsed_ms < 5_000);
    }

    #[tokio::test]
    async fn wait_if_paused_observes_stop() {
        let run = RunHandle::new();
        run.start().unwrap();
        run.pause().unwrap();

        let stopper = run.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            stopper.stop().unwrap();
        });

        assert_eq!(run.wait_if_paused().await, RunStatus::Stopped);
    }
}
