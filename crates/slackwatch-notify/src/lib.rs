//! # slackwatch-notify
//!
//! Alert delivery.
//!
//! - [`NtfyNotifier`]: posts the alert text to an ntfy topic
//! - [`Throttled`]: wraps any [`Notifier`](slackwatch_core::Notifier) and drops
//!   calls that arrive too soon after the last successful delivery

#![deny(unsafe_code)]

pub mod ntfy;
pub mod throttle;

pub use ntfy::{DEFAULT_NTFY_SERVER, NtfyConfig, NtfyNotifier};
pub use throttle::Throttled;
