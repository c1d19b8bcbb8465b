//! One sweep over every DM conversation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use slackwatch_core::text::{DEFAULT_PREVIEW_LENGTH, format_notification};
use slackwatch_core::{
    ChatError, ChatSource, Conversation, Marker, Message, Notifier, StoreError, UserId,
    UserProfile, WatermarkMap, WatermarkStore,
};

use crate::errors::MonitorError;

/// Outcome of one sweep.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Conversations returned by the listing.
    pub conversations: usize,
    /// Conversations whose history was fetched successfully.
    pub checked: usize,
    /// Conversations whose history fetch failed.
    pub failed: usize,
    /// Alerts the notifier accepted.
    pub notified: usize,
    /// The sweep stopped early on cancellation.
    pub cancelled: bool,
    /// Listing failed, so no conversation was checked.
    pub listing_failed: bool,
    /// The watermark map was saved at the end.
    pub persisted: bool,
    /// Wall time of the sweep.
    pub elapsed: Duration,
}

/// Executes sweeps and owns the in-memory watermark map between them.
pub struct CycleEngine {
    source: Arc<dyn ChatSource>,
    notifier: Arc<dyn Notifier>,
    store: Arc<dyn WatermarkStore>,
    self_id: UserId,
    watermarks: WatermarkMap,
    preview_limit: usize,
}

impl std::fmt::Debug for CycleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CycleEngine")
            .field("self_id", &self.self_id)
            .field("tracked", &self.watermarks.len())
            .field("preview_limit", &self.preview_limit)
            .finish_non_exhaustive()
    }
}

impl CycleEngine {
    /// Authenticate and load persisted watermarks.
    ///
    /// Either failure is fatal: without the caller's identity own messages
    /// cannot be suppressed, and without the stored map every conversation
    /// would be treated as first contact.
    pub async fn bootstrap(
        source: Arc<dyn ChatSource>,
        notifier: Arc<dyn Notifier>,
        store: Arc<dyn WatermarkStore>,
    ) -> Result<Self, MonitorError> {
        let self_id = source.authenticate().await.map_err(MonitorError::Auth)?;
        let watermarks = store.load().map_err(MonitorError::Store)?;
        info!(user_id = %self_id, tracked = watermarks.len(), "monitor ready");
        Ok(Self::new(source, notifier, store, self_id, watermarks))
    }

    /// Engine for an already-known identity and map.
    pub fn new(
        source: Arc<dyn ChatSource>,
        notifier: Arc<dyn Notifier>,
        store: Arc<dyn WatermarkStore>,
        self_id: UserId,
        watermarks: WatermarkMap,
    ) -> Self {
        Self {
            source,
            notifier,
            store,
            self_id,
            watermarks,
            preview_limit: DEFAULT_PREVIEW_LENGTH,
        }
    }

    /// Maximum body characters per alert.
    #[must_use]
    pub fn with_preview_limit(mut self, limit: usize) -> Self {
        self.preview_limit = limit;
        self
    }

    /// The authenticated identity whose messages are never alerted on.
    pub fn self_id(&self) -> &UserId {
        &self.self_id
    }

    /// Current in-memory watermarks.
    pub fn watermarks(&self) -> &WatermarkMap {
        &self.watermarks
    }

    /// Run one sweep.
    ///
    /// Never fails: listing, fetch, resolution, delivery and save errors are
    /// logged and reflected in the report. The map is saved at the end even
    /// when the listing failed or the sweep was cancelled part-way.
    pub async fn sweep(&mut self, cancel: &CancellationToken) -> SweepReport {
        let started = Instant::now();
        let mut report = SweepReport::default();
        info!("checking for new messages");

        match self.source.list_conversations().await {
            Ok(conversations) => {
                report.conversations = conversations.len();
                info!(count = conversations.len(), "checking DM conversations");

                for conversation in &conversations {
                    if cancel.is_cancelled() {
                        info!(
                            checked = report.checked + report.failed,
                            remaining = conversations.len() - report.checked - report.failed,
                            "sweep cancelled"
                        );
                        report.cancelled = true;
                        break;
                    }

                    match self.check_conversation(conversation).await {
                        Ok(notified) => {
                            report.checked += 1;
                            report.notified += notified;
                        }
                        Err(e) => {
                            report.failed += 1;
                            warn!(
                                conversation_id = %conversation.id,
                                error = %e,
                                error_kind = e.error_kind(),
                                "failed to check conversation"
                            );
                        }
                    }
                }
            }
            Err(e) => {
                report.listing_failed = true;
                warn!(error = %e, error_kind = e.error_kind(), "failed to list conversations");
            }
        }

        report.persisted = self.persist();
        report.elapsed = started.elapsed();
        report
    }

    /// Save the current map. Called once more on shutdown.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.store.save(&self.watermarks)?;
        info!(tracked = self.watermarks.len(), "state saved");
        Ok(())
    }

    fn persist(&self) -> bool {
        match self.flush() {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "failed to save state");
                false
            }
        }
    }

    /// Fetch and process one conversation. Returns the number of alerts
    /// delivered. A fetch error leaves the watermark where it was, apart from
    /// the first-contact marker which is kept.
    async fn check_conversation(&mut self, conversation: &Conversation) -> Result<usize, ChatError> {
        let id = &conversation.id;

        let (since, existed) = match self.watermarks.get(id) {
            Some(marker) => (marker.clone(), true),
            None => {
                // Start from now so existing history is never replayed.
                let now = Marker::now();
                let _ = self.watermarks.advance(id, now.clone());
                debug!(conversation_id = %id, marker = %now, "first contact");
                (now, false)
            }
        };

        let mut messages = self.source.fetch_history_since(id, &since).await?;
        messages.reverse();

        let mut processed = 0usize;
        let mut delivered = 0usize;
        for message in messages {
            if !self.should_notify(&message) {
                continue;
            }

            let name = self.display_name(&message.user).await;
            let text = format_notification(&name, &message.text, self.preview_limit);
            match self.notifier.notify(&text).await {
                Ok(()) => delivered += 1,
                Err(e) => warn!(
                    conversation_id = %id,
                    user_id = %message.user,
                    error = %e,
                    "failed to send notification"
                ),
            }

            let _ = self.watermarks.advance(id, message.ts);
            processed += 1;
        }

        if processed == 0 && existed {
            let _ = self.watermarks.advance(id, Marker::now());
        }

        if processed > 0 {
            debug!(conversation_id = %id, processed, delivered, "new messages processed");
        }
        Ok(delivered)
    }

    fn should_notify(&self, message: &Message) -> bool {
        !message.user.is_empty() && message.kind.is_actionable() && message.user != self.self_id
    }

    async fn display_name(&self, user: &UserId) -> String {
        let profile = match self.source.resolve_user(user).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(user_id = %user, error = %e, "failed to resolve user, using raw id");
                UserProfile::unresolved(user)
            }
        };
        match profile.display_name() {
            "" => user.to_string(),
            name => name.to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use slackwatch_core::{ConversationId, MessageKind};

    use super::*;
    use crate::testing::{FakeChatSource, MemoryStore, RecordingNotifier};

    struct Harness {
        source: Arc<FakeChatSource>,
        notifier: Arc<RecordingNotifier>,
        store: Arc<MemoryStore>,
    }

    impl Harness {
        fn new(source: FakeChatSource) -> Self {
            Self {
                source: Arc::new(source),
                notifier: Arc::new(RecordingNotifier::new()),
                store: Arc::new(MemoryStore::new()),
            }
        }

        fn with_marks(self, marks: &[(&str, &str)]) -> Self {
            let map = marks
                .iter()
                .map(|(c, m)| (ConversationId::from(*c), Marker::from(*m)))
                .collect();
            Self {
                store: Arc::new(MemoryStore::with_map(map)),
                ..self
            }
        }

        async fn engine(&self) -> CycleEngine {
            CycleEngine::bootstrap(
                self.source.clone(),
                self.notifier.clone(),
                self.store.clone(),
            )
            .await
            .unwrap()
        }
    }

    fn mark(engine: &CycleEngine, conversation: &str) -> Marker {
        engine
            .watermarks()
            .get(&ConversationId::from(conversation))
            .cloned()
            .unwrap()
    }

    fn msg(ts: &str, user: &str, text: &str) -> Message {
        Message::text(ts, user, text)
    }

    #[tokio::test]
    async fn notifies_oldest_first_and_advances_to_newest() {
        let source = FakeChatSource::new("U0SELF")
            .with_conversation("D1", "U2")
            .with_user("U2", "jdoe", "Jane Doe");
        source.post("D1", msg("105.0", "U2", "hi"));
        source.post("D1", msg("103.0", "U2", "yo"));
        let h = Harness::new(source).with_marks(&[("D1", "100.0")]);

        let mut engine = h.engine().await;
        let report = engine.sweep(&CancellationToken::new()).await;

        assert_eq!(h.notifier.sent(), ["DM from Jane Doe: yo", "DM from Jane Doe: hi"]);
        assert_eq!(mark(&engine, "D1"), Marker::from("105.0"));
        assert_eq!(report.notified, 2);
        assert_eq!(report.checked, 1);
        assert!(report.persisted);
    }

    #[tokio::test]
    async fn first_contact_suppresses_backlog() {
        let source = FakeChatSource::new("U0SELF").with_conversation("D1", "U2");
        for i in 0..5 {
            source.post("D1", msg(&format!("1000000{i}.000000"), "U2", "old"));
        }
        let h = Harness::new(source);
        let before = Marker::now();

        let mut engine = h.engine().await;
        let report = engine.sweep(&CancellationToken::new()).await;

        assert!(h.notifier.sent().is_empty());
        assert_eq!(report.notified, 0);
        assert!(mark(&engine, "D1") >= before);
        assert!(h.store.snapshot().contains(&ConversationId::from("D1")));
    }

    #[tokio::test]
    async fn filter_table() {
        struct Case {
            user: &'static str,
            kind: MessageKind,
            notifies: bool,
        }
        let cases = [
            Case { user: "", kind: MessageKind::Message, notifies: false },
            Case { user: "U2", kind: MessageKind::Other("channel_join".into()), notifies: false },
            Case { user: "U0SELF", kind: MessageKind::Message, notifies: false },
            Case { user: "U2", kind: MessageKind::Message, notifies: true },
        ];

        for case in cases {
            let source = FakeChatSource::new("U0SELF").with_conversation("D1", "U2");
            source.post(
                "D1",
                Message {
                    kind: case.kind.clone(),
                    ..msg("200.0", case.user, "body")
                },
            );
            let h = Harness::new(source).with_marks(&[("D1", "100.0")]);
            let mut engine = h.engine().await;
            let _ = engine.sweep(&CancellationToken::new()).await;

            assert_eq!(
                h.notifier.sent().len(),
                usize::from(case.notifies),
                "user={:?} kind={:?}",
                case.user,
                case.kind
            );
        }
    }

    #[tokio::test]
    async fn own_message_never_notifies_but_window_closes() {
        let source = FakeChatSource::new("U0SELF").with_conversation("D1", "U2");
        source.post("D1", msg("200.0", "U0SELF", "note to self"));
        let h = Harness::new(source).with_marks(&[("D1", "100.0")]);

        let mut engine = h.engine().await;
        let _ = engine.sweep(&CancellationToken::new()).await;

        assert!(h.notifier.sent().is_empty());
        assert_eq!(h.source.resolve_count(), 0);
        // Nothing passed the filter, so the marker jumps to now.
        assert!(mark(&engine, "D1") > Marker::from("200.0"));
    }

    #[tokio::test]
    async fn quiet_conversation_advances_to_now() {
        let source = FakeChatSource::new("U0SELF").with_conversation("D1", "U2");
        let h = Harness::new(source).with_marks(&[("D1", "100.0")]);
        let before = Marker::now();

        let mut engine = h.engine().await;
        let _ = engine.sweep(&CancellationToken::new()).await;

        assert!(mark(&engine, "D1") >= before);
    }

    #[tokio::test]
    async fn fetch_failure_leaves_marker_and_continues() {
        let source = FakeChatSource::new("U0SELF")
            .with_conversation("D1", "U2")
            .with_conversation("D2", "U3");
        source.set_history_failing("D1", true);
        source.post("D2", msg("150.0", "U3", "still delivered"));
        let h = Harness::new(source).with_marks(&[("D1", "100.0"), ("D2", "100.0")]);

        let mut engine = h.engine().await;
        let report = engine.sweep(&CancellationToken::new()).await;

        assert_eq!(mark(&engine, "D1"), Marker::from("100.0"));
        assert_eq!(mark(&engine, "D2"), Marker::from("150.0"));
        assert_eq!(report.failed, 1);
        assert_eq!(report.checked, 1);
        assert_eq!(h.notifier.sent(), ["DM from U3: still delivered"]);
    }

    #[tokio::test]
    async fn fetch_failure_on_first_contact_keeps_now_marker() {
        let source = FakeChatSource::new("U0SELF").with_conversation("D1", "U2");
        source.set_history_failing("D1", true);
        let h = Harness::new(source);

        let mut engine = h.engine().await;
        let _ = engine.sweep(&CancellationToken::new()).await;

        assert!(h.store.snapshot().contains(&ConversationId::from("D1")));
    }

    #[tokio::test]
    async fn listing_failure_still_persists() {
        let source = FakeChatSource::new("U0SELF").with_conversation("D1", "U2");
        source.set_listing_failing(true);
        let h = Harness::new(source).with_marks(&[("D1", "100.0")]);

        let mut engine = h.engine().await;
        let report = engine.sweep(&CancellationToken::new()).await;

        assert!(report.listing_failed);
        assert_eq!(report.checked, 0);
        assert!(report.persisted);
        assert_eq!(h.store.save_count(), 1);
        assert!(h.source.fetches().is_empty());
    }

    #[tokio::test]
    async fn unresolvable_sender_uses_raw_id() {
        let source = FakeChatSource::new("U0SELF").with_conversation("D1", "U404");
        source.post("D1", msg("200.0", "U404", "who am i"));
        let h = Harness::new(source).with_marks(&[("D1", "100.0")]);

        let mut engine = h.engine().await;
        let _ = engine.sweep(&CancellationToken::new()).await;

        assert_eq!(h.notifier.sent(), ["DM from U404: who am i"]);
    }

    #[tokio::test]
    async fn handle_used_when_real_name_missing() {
        let source = FakeChatSource::new("U0SELF")
            .with_conversation("D1", "U2")
            .with_user("U2", "jdoe", "");
        source.post("D1", msg("200.0", "U2", "hey"));
        let h = Harness::new(source).with_marks(&[("D1", "100.0")]);

        let mut engine = h.engine().await;
        let _ = engine.sweep(&CancellationToken::new()).await;

        assert_eq!(h.notifier.sent(), ["DM from jdoe: hey"]);
    }

    #[tokio::test]
    async fn delivery_failure_still_advances() {
        let source = FakeChatSource::new("U0SELF").with_conversation("D1", "U2");
        source.post("D1", msg("200.0", "U2", "a"));
        source.post("D1", msg("201.0", "U2", "b"));
        let h = Harness::new(source).with_marks(&[("D1", "100.0")]);
        h.notifier.set_failing(true);

        let mut engine = h.engine().await;
        let report = engine.sweep(&CancellationToken::new()).await;

        assert_eq!(h.notifier.attempts(), 2);
        assert_eq!(report.notified, 0);
        assert_eq!(mark(&engine, "D1"), Marker::from("201.0"));
    }

    #[tokio::test]
    async fn save_failure_is_reported_not_raised() {
        let source = FakeChatSource::new("U0SELF").with_conversation("D1", "U2");
        let h = Harness::new(source);
        h.store.set_failing(true);

        let mut engine = h.engine().await;
        let report = engine.sweep(&CancellationToken::new()).await;

        assert!(!report.persisted);
        assert!(engine.watermarks().contains(&ConversationId::from("D1")));
        assert!(engine.flush().is_err());
    }

    #[tokio::test]
    async fn long_body_is_truncated() {
        let source = FakeChatSource::new("U0SELF")
            .with_conversation("D1", "U2")
            .with_user("U2", "", "Jane");
        source.post("D1", msg("200.0", "U2", &"x".repeat(40)));
        let h = Harness::new(source).with_marks(&[("D1", "100.0")]);

        let mut engine = h.engine().await.with_preview_limit(10);
        let _ = engine.sweep(&CancellationToken::new()).await;

        assert_eq!(h.notifier.sent(), ["DM from Jane: xxxxxxx..."]);
    }

    #[tokio::test]
    async fn tiny_preview_limit_is_a_hard_cap() {
        let source = FakeChatSource::new("U0SELF")
            .with_conversation("D1", "U2")
            .with_user("U2", "", "Jane");
        source.post("D1", msg("200.0", "U2", "hello"));
        let h = Harness::new(source).with_marks(&[("D1", "100.0")]);

        let mut engine = h.engine().await.with_preview_limit(2);
        let _ = engine.sweep(&CancellationToken::new()).await;

        assert_eq!(h.notifier.sent(), ["DM from Jane: he"]);
    }

    #[tokio::test]
    async fn second_sweep_fetches_from_advanced_marker() {
        let source = FakeChatSource::new("U0SELF").with_conversation("D1", "U2");
        source.post("D1", msg("200.0", "U2", "first"));
        let h = Harness::new(source).with_marks(&[("D1", "100.0")]);

        let mut engine = h.engine().await;
        let _ = engine.sweep(&CancellationToken::new()).await;
        h.source.post("D1", msg("300.0", "U2", "second"));
        let _ = engine.sweep(&CancellationToken::new()).await;

        let fetches = h.source.fetches();
        assert_eq!(fetches[0].1, Marker::from("100.0"));
        assert_eq!(fetches[1].1, Marker::from("200.0"));
        assert_eq!(h.notifier.sent(), ["DM from U2: first", "DM from U2: second"]);
    }

    #[tokio::test]
    async fn cancelled_before_start_checks_nothing() {
        let source = FakeChatSource::new("U0SELF")
            .with_conversation("D1", "U2")
            .with_conversation("D2", "U3");
        let h = Harness::new(source);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut engine = h.engine().await;
        let report = engine.sweep(&cancel).await;

        assert!(report.cancelled);
        assert_eq!(report.checked, 0);
        assert!(h.source.fetches().is_empty());
        assert!(report.persisted);
    }

    #[tokio::test]
    async fn bootstrap_rejects_bad_credentials() {
        let source = FakeChatSource::new("U0SELF");
        source.set_reject_auth(true);
        let h = Harness::new(source);

        let result = CycleEngine::bootstrap(h.source.clone(), h.notifier.clone(), h.store.clone()).await;
        assert_matches!(result, Err(MonitorError::Auth(ChatError::Auth(_))));
    }
}
