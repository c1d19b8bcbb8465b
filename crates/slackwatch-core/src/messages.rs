//! Conversations, messages and user profiles as the monitor sees them.

use serde::{Deserialize, Serialize};

use crate::ids::{ConversationId, UserId};
use crate::marker::Marker;

/// A direct-message conversation between the caller and one counterpart.
///
/// Re-listed from the chat source every sweep and never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// Channel id of the DM.
    pub id: ConversationId,
    /// The other participant.
    pub user: UserId,
}

impl Conversation {
    /// Build a conversation from raw ids.
    pub fn new(id: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            id: ConversationId::from_raw(id),
            user: UserId::from_raw(user),
        }
    }
}

/// Message kind discriminator.
///
/// Only [`MessageKind::Message`] is actionable; joins, edits and other system
/// events arrive with a different `type` and are ignored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageKind {
    /// An ordinary user message.
    Message,
    /// Anything else, with the raw discriminator preserved.
    Other(String),
}

impl MessageKind {
    /// Whether this kind can produce a notification.
    pub fn is_actionable(&self) -> bool {
        matches!(self, Self::Message)
    }
}

impl From<String> for MessageKind {
    fn from(s: String) -> Self {
        if s == "message" {
            Self::Message
        } else {
            Self::Other(s)
        }
    }
}

impl From<MessageKind> for String {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Message => "message".to_string(),
            MessageKind::Other(s) => s,
        }
    }
}

/// A single message in a conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Per-conversation increasing timestamp token.
    pub ts: Marker,
    /// Sender; empty for bot and system messages.
    pub user: UserId,
    /// Body text.
    pub text: String,
    /// Kind discriminator.
    pub kind: MessageKind,
}

impl Message {
    /// Convenience constructor for an ordinary user message.
    pub fn text(ts: &str, user: &str, text: &str) -> Self {
        Self {
            ts: Marker::from(ts),
            user: UserId::from(user),
            text: text.to_string(),
            kind: MessageKind::Message,
        }
    }
}

/// Profile data returned when resolving a user id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// User id.
    pub id: UserId,
    /// Handle (`jdoe`).
    pub name: String,
    /// Full name (`Jane Doe`), often empty for bots.
    pub real_name: String,
}

impl UserProfile {
    /// Profile that only knows the raw id, used when resolution fails.
    pub fn unresolved(id: &UserId) -> Self {
        Self {
            id: id.clone(),
            name: id.as_str().to_string(),
            real_name: String::new(),
        }
    }

    /// Real name, then handle, then raw id.
    pub fn display_name(&self) -> &str {
        if !self.real_name.is_empty() {
            &self.real_name
        } else if !self.name.is_empty() {
            &self.name
        } else {
            self.id.as_str()
        }
    }
}
