//! # slackwatch-core
//!
//! Shared vocabulary for the direct-message monitor.
//!
//! - [`ids`]: branded string identifiers for conversations and users
//! - [`marker`]: the opaque, totally-ordered timestamp token Slack hands out
//! - [`messages`]: conversations, messages and user profiles
//! - [`watermark`]: the per-conversation "last processed" map
//! - [`traits`]: the capability seams the cycle engine depends on
//! - [`errors`]: typed errors for each capability
//! - [`text`]: notification text formatting

#![deny(unsafe_code)]

pub mod errors;
pub mod ids;
pub mod marker;
pub mod messages;
pub mod text;
pub mod traits;
pub mod watermark;

pub use errors::{ChatError, NotifyError, StoreError};
pub use ids::{ConversationId, UserId};
pub use marker::Marker;
pub use messages::{Conversation, Message, MessageKind, UserProfile};
pub use traits::{ChatSource, Notifier, WatermarkStore};
pub use watermark::WatermarkMap;
