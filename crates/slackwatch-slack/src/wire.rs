//! Response bodies as the Web API returns them.
//!
//! Every method wraps its payload in the same envelope: `ok`, an `error` code
//! when `ok` is false, and method-specific fields alongside. Payload fields
//! default so an `ok: false` body still decodes.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(flatten)]
    pub body: T,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct AuthTest {
    pub user_id: String,
    pub user: String,
    pub team: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ConversationsList {
    pub channels: Vec<Channel>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Channel {
    pub id: String,
    pub user: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ConversationsHistory {
    pub messages: Vec<HistoryMessage>,
    pub has_more: bool,
    pub response_metadata: ResponseMetadata,
}

impl ConversationsHistory {
    /// Cursor for the next (older) page, if there is one.
    pub fn next_cursor(&self) -> Option<&str> {
        let cursor = self.response_metadata.next_cursor.as_str();
        (self.has_more && !cursor.is_empty()).then_some(cursor)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ResponseMetadata {
    pub next_cursor: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct HistoryMessage {
    pub ts: String,
    pub user: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct UsersInfo {
    pub user: User,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct User {
    pub id: String,
    pub name: String,
    pub real_name: String,
}
