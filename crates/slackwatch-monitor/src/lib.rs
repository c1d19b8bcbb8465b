//! # slackwatch-monitor
//!
//! The polling loop.
//!
//! A [`CycleEngine`] performs one sweep: list DM conversations, fetch what is
//! new in each since its watermark, notify oldest first, advance watermarks,
//! persist. A [`Scheduler`] drives sweeps with a check, run, wait loop so a
//! slow sweep delays the next one instead of overlapping it.
//!
//! Both stop cooperatively on a [`CancellationToken`](tokio_util::sync::CancellationToken):
//! between conversations inside a sweep and during the wait between sweeps.

#![deny(unsafe_code)]

pub mod engine;
pub mod errors;
pub mod scheduler;
pub mod testing;

pub use engine::{CycleEngine, SweepReport};
pub use errors::MonitorError;
pub use scheduler::{Scheduler, SchedulerState, Sweeper};
