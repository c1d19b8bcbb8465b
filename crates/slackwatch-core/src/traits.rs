//! Capability seams.
//!
//! The cycle engine only talks to the outside world through these traits so
//! it can be driven by in-memory fakes in tests.

use async_trait::async_trait;

use crate::errors::{ChatError, NotifyError, StoreError};
use crate::ids::{ConversationId, UserId};
use crate::marker::Marker;
use crate::messages::{Conversation, Message, UserProfile};
use crate::watermark::WatermarkMap;

/// Read access to the chat service.
#[async_trait]
pub trait ChatSource: Send + Sync {
    /// Validate credentials and return the caller's own user id.
    async fn authenticate(&self) -> Result<UserId, ChatError>;

    /// List the caller's direct-message conversations.
    async fn list_conversations(&self) -> Result<Vec<Conversation>, ChatError>;

    /// Messages strictly newer than `since`, **newest first**.
    async fn fetch_history_since(
        &self,
        conversation: &ConversationId,
        since: &Marker,
    ) -> Result<Vec<Message>, ChatError>;

    /// Look up a user's profile.
    async fn resolve_user(&self, user: &UserId) -> Result<UserProfile, ChatError>;
}

/// Delivery of a formatted alert.
///
/// Implementations may drop calls to enforce a rate limit; a dropped call
/// still returns `Ok(())`.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one alert.
    async fn notify(&self, text: &str) -> Result<(), NotifyError>;
}

/// Durable storage for the watermark map.
pub trait WatermarkStore: Send + Sync {
    /// Load the full map. Missing storage yields an empty map.
    fn load(&self) -> Result<WatermarkMap, StoreError>;

    /// Replace the stored map atomically.
    fn save(&self, map: &WatermarkMap) -> Result<(), StoreError>;
}
