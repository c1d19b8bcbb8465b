//! HTTP client for the four Web API methods the monitor needs.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use reqwest::header::COOKIE;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use slackwatch_core::{
    ChatError, ChatSource, Conversation, ConversationId, Marker, Message, MessageKind, UserId,
    UserProfile,
};

use crate::wire::{AuthTest, ConversationsHistory, ConversationsList, Envelope, UsersInfo};

/// Production API root.
pub const DEFAULT_API_BASE_URL: &str = "https://slack.com/api";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONVERSATION_LIMIT: &str = "500";
const MESSAGE_LIMIT: &str = "100";
/// Pages of history fetched per conversation before giving up on the rest.
const MAX_HISTORY_PAGES: u32 = 10;
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/136.0.0.0 Safari/537.36";

/// `d-s` must trail the current time slightly.
const SESSION_COOKIE_SKEW_SECS: i64 = 10;

#[derive(Clone, Copy)]
enum Verb {
    Get,
    Post,
}

/// Slack Web API client using browser-session credentials.
pub struct SlackClient {
    base_url: String,
    session_token: SecretString,
    cookie_token: SecretString,
    http: reqwest::Client,
}

impl std::fmt::Debug for SlackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl SlackClient {
    /// Client against the production API.
    pub fn new(session_token: SecretString, cookie_token: SecretString) -> Result<Self, ChatError> {
        Self::with_base_url(session_token, cookie_token, DEFAULT_API_BASE_URL)
    }

    /// Client against an arbitrary API root (e.g. a mock server).
    pub fn with_base_url(
        session_token: SecretString,
        cookie_token: SecretString,
        base_url: impl Into<String>,
    ) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(BROWSER_USER_AGENT)
            .build()
            .map_err(|e| ChatError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session_token,
            cookie_token,
            http,
        })
    }

    /// API root in use.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn cookie_header(&self) -> String {
        format!(
            "d={}; d-s={}",
            self.cookie_token.expose_secret(),
            Utc::now().timestamp() - SESSION_COOKIE_SKEW_SECS
        )
    }

    /// Call `method`, check the HTTP status and the `ok` flag, and decode the
    /// payload. The session token is appended to `params`.
    async fn call<T>(&self, verb: Verb, method: &str, params: &[(&str, &str)]) -> Result<T, ChatError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}/{method}", self.base_url);
        let mut fields = params.to_vec();
        fields.push(("token", self.session_token.expose_secret()));

        let request = match verb {
            Verb::Get => self.http.get(&url).query(&fields),
            Verb::Post => self.http.post(&url).form(&fields),
        };

        // The URL carries the token on GET requests; keep it out of errors.
        let response = request
            .header(COOKIE, self.cookie_header())
            .send()
            .await
            .map_err(|e| ChatError::Network(e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ChatError::Network(e.without_url().to_string()))?;

        if status != StatusCode::OK {
            return Err(ChatError::from_status(status.as_u16(), body));
        }

        let envelope: Envelope<T> = serde_json::from_str(&body)
            .map_err(|e| ChatError::Decode(format!("{method}: {e}")))?;

        if !envelope.ok {
            let error = envelope.error.unwrap_or_else(|| "unknown_error".to_string());
            return Err(ChatError::from_api(method, error));
        }

        debug!(method, "Slack API call succeeded");
        Ok(envelope.body)
    }
}

#[async_trait]
impl ChatSource for SlackClient {
    async fn authenticate(&self) -> Result<UserId, ChatError> {
        let auth: AuthTest = self
            .call(Verb::Post, "auth.test", &[])
            .await
            .map_err(|e| match e {
                // Any refusal from auth.test means the credentials are unusable.
                ChatError::Api { error, .. } => ChatError::Auth(error),
                other => other,
            })?;

        if auth.user_id.is_empty() {
            return Err(ChatError::Decode("auth.test: missing user_id".to_string()));
        }

        info!(
            user = %auth.user,
            user_id = %auth.user_id,
            team = %auth.team,
            "authenticated"
        );
        Ok(UserId::from_raw(auth.user_id))
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>, ChatError> {
        let list: ConversationsList = self
            .call(
                Verb::Get,
                "conversations.list",
                &[
                    ("types", "im"),
                    ("exclude_archived", "true"),
                    ("limit", CONVERSATION_LIMIT),
                ],
            )
            .await?;

        Ok(list
            .channels
            .into_iter()
            .map(|ch| Conversation::new(ch.id, ch.user))
            .collect())
    }

    async fn fetch_history_since(
        &self,
        conversation: &ConversationId,
        since: &Marker,
    ) -> Result<Vec<Message>, ChatError> {
        let mut messages = Vec::new();
        let mut cursor = String::new();

        for page in 1..=MAX_HISTORY_PAGES {
            let mut params = vec![("channel", conversation.as_str())];
            if !since.is_empty() {
                params.push(("oldest", since.as_str()));
            }
            params.push(("limit", MESSAGE_LIMIT));
            if !cursor.is_empty() {
                params.push(("cursor", cursor.as_str()));
            }

            let history: ConversationsHistory = self
                .call(Verb::Get, "conversations.history", &params)
                .await?;

            let next = history.next_cursor().map(str::to_string);
            // Pages run newest to oldest, so appending keeps the order.
            messages.extend(history.messages.into_iter().map(|m| Message {
                ts: Marker::from_raw(m.ts),
                user: UserId::from_raw(m.user),
                text: m.text,
                kind: MessageKind::from(m.kind),
            }));

            match next {
                Some(next) if page < MAX_HISTORY_PAGES => cursor = next,
                Some(_) => {
                    warn!(
                        conversation_id = %conversation,
                        pages = MAX_HISTORY_PAGES,
                        fetched = messages.len(),
                        "history page limit reached, older messages skipped"
                    );
                    break;
                }
                None => break,
            }
        }

        Ok(messages)
    }

    async fn resolve_user(&self, user: &UserId) -> Result<UserProfile, ChatError> {
        let info: UsersInfo = self
            .call(Verb::Get, "users.info", &[("user", user.as_str())])
            .await?;

        Ok(UserProfile {
            id: UserId::from_raw(info.user.id),
            name: info.user.name,
            real_name: info.user.real_name,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
