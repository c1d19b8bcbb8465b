//! # slackwatch-slack
//!
//! [`ChatSource`](slackwatch_core::ChatSource) implementation over the Slack
//! Web API, authenticated the way a logged-in browser session is: the `xoxc`
//! session token travels as the `token` parameter and the `xoxd` cookie token
//! as the `d` cookie, alongside a `d-s` timestamp cookie.

#![deny(unsafe_code)]

pub mod client;
mod wire;

pub use client::{DEFAULT_API_BASE_URL, SlackClient};
