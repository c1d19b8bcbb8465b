//! In-memory implementations of the capability traits.
//!
//! Used by this crate's tests and its integration tests; also handy for
//! exercising the engine without network access.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use slackwatch_core::{
    ChatError, ChatSource, Conversation, ConversationId, Marker, Message, NotifyError, Notifier,
    StoreError, UserId, UserProfile, WatermarkMap, WatermarkStore,
};

/// Scripted chat source.
///
/// History is kept per conversation in any order; fetches return the
/// messages strictly newer than the requested marker, newest first, the way
/// the real API does.
pub struct FakeChatSource {
    self_id: UserId,
    reject_auth: AtomicBool,
    fail_listing: AtomicBool,
    conversations: Mutex<Vec<Conversation>>,
    history: Mutex<HashMap<ConversationId, Vec<Message>>>,
    failing: Mutex<HashSet<ConversationId>>,
    users: Mutex<HashMap<UserId, UserProfile>>,
    fetch_delay: Mutex<Duration>,
    fetches: Mutex<Vec<(ConversationId, Marker)>>,
    resolves: AtomicUsize,
}

impl FakeChatSource {
    /// Source whose authenticated identity is `self_id`.
    pub fn new(self_id: &str) -> Self {
        Self {
            self_id: UserId::from(self_id),
            reject_auth: AtomicBool::new(false),
            fail_listing: AtomicBool::new(false),
            conversations: Mutex::new(Vec::new()),
            history: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            users: Mutex::new(HashMap::new()),
            fetch_delay: Mutex::new(Duration::ZERO),
            fetches: Mutex::new(Vec::new()),
            resolves: AtomicUsize::new(0),
        }
    }

    /// Add a DM conversation with `user`.
    #[must_use]
    pub fn with_conversation(self, id: &str, user: &str) -> Self {
        self.conversations.lock().push(Conversation::new(id, user));
        self
    }

    /// Register a resolvable user.
    #[must_use]
    pub fn with_user(self, id: &str, name: &str, real_name: &str) -> Self {
        let profile = UserProfile {
            id: UserId::from(id),
            name: name.to_string(),
            real_name: real_name.to_string(),
        };
        let _ = self.users.lock().insert(profile.id.clone(), profile);
        self
    }

    /// Delay every history fetch by `delay`.
    #[must_use]
    pub fn with_fetch_delay(self, delay: Duration) -> Self {
        *self.fetch_delay.lock() = delay;
        self
    }

    /// Append a message to a conversation's history.
    pub fn post(&self, conversation: &str, message: Message) {
        self.history
            .lock()
            .entry(ConversationId::from(conversation))
            .or_default()
            .push(message);
    }

    /// Make history fetches for `conversation` fail (or succeed again).
    pub fn set_history_failing(&self, conversation: &str, failing: bool) {
        let id = ConversationId::from(conversation);
        let mut set = self.failing.lock();
        if failing {
            let _ = set.insert(id);
        } else {
            let _ = set.remove(&id);
        }
    }

    /// Make `list_conversations` fail.
    pub fn set_listing_failing(&self, failing: bool) {
        self.fail_listing.store(failing, Ordering::SeqCst);
    }

    /// Make `authenticate` fail with an auth error.
    pub fn set_reject_auth(&self, reject: bool) {
        self.reject_auth.store(reject, Ordering::SeqCst);
    }

    /// Every `(conversation, since)` pair fetched so far.
    pub fn fetches(&self) -> Vec<(ConversationId, Marker)> {
        self.fetches.lock().clone()
    }

    /// Number of `resolve_user` calls.
    pub fn resolve_count(&self) -> usize {
        self.resolves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatSource for FakeChatSource {
    async fn authenticate(&self) -> Result<UserId, ChatError> {
        if self.reject_auth.load(Ordering::SeqCst) {
            return Err(ChatError::Auth("invalid_auth".into()));
        }
        Ok(self.self_id.clone())
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>, ChatError> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(ChatError::Network("connection reset".into()));
        }
        Ok(self.conversations.lock().clone())
    }

    async fn fetch_history_since(
        &self,
        conversation: &ConversationId,
        since: &Marker,
    ) -> Result<Vec<Message>, ChatError> {
        self.fetches.lock().push((conversation.clone(), since.clone()));

        let delay = *self.fetch_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.failing.lock().contains(conversation) {
            return Err(ChatError::Api {
                method: "conversations.history".into(),
                error: "channel_not_found".into(),
            });
        }

        let mut newer: Vec<Message> = self
            .history
            .lock()
            .get(conversation)
            .map(|all| all.iter().filter(|m| m.ts > *since).cloned().collect())
            .unwrap_or_default();
        newer.sort_by(|a, b| b.ts.cmp(&a.ts));
        Ok(newer)
    }

    async fn resolve_user(&self, user: &UserId) -> Result<UserProfile, ChatError> {
        let _ = self.resolves.fetch_add(1, Ordering::SeqCst);
        self.users.lock().get(user).cloned().ok_or_else(|| ChatError::Api {
            method: "users.info".into(),
            error: "user_not_found".into(),
        })
    }
}

/// Notifier that records every alert it is asked to send.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
    attempts: AtomicUsize,
    failing: AtomicBool,
}

impl RecordingNotifier {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivered alerts, in order.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    /// Calls to `notify`, delivered or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Make every delivery fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, text: &str) -> Result<(), NotifyError> {
        let _ = self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Status {
                status: 500,
                body: "relay down".into(),
            });
        }
        self.sent.lock().push(text.to_string());
        Ok(())
    }
}

/// Watermark store held in memory.
#[derive(Default)]
pub struct MemoryStore {
    map: Mutex<WatermarkMap>,
    saves: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryStore {
    /// Empty store, as on a first run.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store preloaded with `map`.
    pub fn with_map(map: WatermarkMap) -> Self {
        Self {
            map: Mutex::new(map),
            ..Self::default()
        }
    }

    /// Last saved map.
    pub fn snapshot(&self) -> WatermarkMap {
        self.map.lock().clone()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Make every save fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl WatermarkStore for MemoryStore {
    fn load(&self) -> Result<WatermarkMap, StoreError> {
        Ok(self.map.lock().clone())
    }

    fn save(&self, map: &WatermarkMap) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Io("disk full".into()));
        }
        *self.map.lock() = map.clone();
        let _ = self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
