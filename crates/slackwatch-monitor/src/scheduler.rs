//! Check, run, wait loop.
//!
//! The wait is measured from the end of a sweep, so a sweep that takes longer
//! than the poll interval delays the next one rather than overlapping it.
//! There is no free-running timer.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::info;

use slackwatch_core::StoreError;

use crate::engine::{CycleEngine, SweepReport};

/// Something the scheduler can run repeatedly.
#[async_trait]
pub trait Sweeper: Send {
    /// Run one complete sweep. Must return (not error) on partial failure.
    async fn sweep(&mut self, cancel: &CancellationToken) -> SweepReport;

    /// Persist whatever state the sweeper holds.
    fn flush(&self) -> Result<(), StoreError>;
}

#[async_trait]
impl Sweeper for CycleEngine {
    async fn sweep(&mut self, cancel: &CancellationToken) -> SweepReport {
        CycleEngine::sweep(self, cancel).await
    }

    fn flush(&self) -> Result<(), StoreError> {
        CycleEngine::flush(self)
    }
}

/// Scheduler lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    /// Created, not started.
    Idle,
    /// A sweep is in progress.
    RunningCycle,
    /// Between sweeps.
    Waiting,
    /// Cancelled. Terminal.
    Stopped,
}

/// Drives a [`Sweeper`] on a fixed cadence until cancelled.
pub struct Scheduler<S: Sweeper> {
    sweeper: S,
    interval: Duration,
    state: watch::Sender<SchedulerState>,
}

impl<S: Sweeper> Scheduler<S> {
    /// Scheduler that waits `interval` after each sweep.
    pub fn new(sweeper: S, interval: Duration) -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        Self {
            sweeper,
            interval,
            state,
        }
    }

    /// Follow state transitions.
    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    /// Current state.
    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Give back the sweeper, e.g. for a final flush.
    pub fn into_sweeper(self) -> S {
        self.sweeper
    }

    fn transition(&self, next: SchedulerState) {
        let _ = self.state.send_replace(next);
    }

    /// Sweep immediately, then wait and sweep again until `cancel` fires.
    ///
    /// Returns the number of sweeps started. Cancellation is observed before
    /// each sweep, between conversations inside a sweep, and during the wait.
    pub async fn run(&mut self, cancel: &CancellationToken) -> u64 {
        let mut cycles = 0u64;

        loop {
            if cancel.is_cancelled() {
                break;
            }

            self.transition(SchedulerState::RunningCycle);
            let report = self.sweeper.sweep(cancel).await;
            cycles += 1;

            if report.cancelled || cancel.is_cancelled() {
                break;
            }

            info!(
                cycle = cycles,
                elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
                conversations = report.conversations,
                notified = report.notified,
                failed = report.failed,
                wait_secs = self.interval.as_secs(),
                "check cycle completed"
            );

            self.transition(SchedulerState::Waiting);
            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.interval) => {}
            }
        }

        self.transition(SchedulerState::Stopped);
        cycles
    }

    /// Run exactly one sweep and stop.
    pub async fn run_once(&mut self, cancel: &CancellationToken) -> SweepReport {
        self.transition(SchedulerState::RunningCycle);
        let report = self.sweeper.sweep(cancel).await;
        info!(
            elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
            conversations = report.conversations,
            notified = report.notified,
            "single check completed"
        );
        self.transition(SchedulerState::Stopped);
        report
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
