//! Session orchestrator: the per-event turn protocol.
//!
//! For every inbound event:
//! 1. take the user's turn lock (events of one user run one at a time, in
//!    arrival order; other users are unaffected)
//! 2. normalize the payload into text
//! 3. append it as a `user` turn
//! 4. send the full history to the completion provider
//! 5. on success append the reply as an `assistant` turn
//! 6. deliver either the reply or the fixed apology
//!
//! A failure in step 2 or 4 never produces an assistant turn. The user turn from
//! step 3 stays, so the user's own input is not lost.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::{Instrument, error, info, info_span, warn};

use relay_types::error::{CompletionError, NormalizeError};
use relay_types::event::InboundEvent;
use relay_types::turn::Role;

use crate::conversation::{ConversationHandle, ConversationStore};
use crate::llm::provider::CompletionProvider;
use crate::normalize::normalize;
use crate::platform::{MediaSource, ReplySink};

/// Reply sent whenever an event cannot be answered.
pub const APOLOGY_TEXT: &str = "ขออภัย เกิดข้อผิดพลาดในการประมวลผล";

/// Failures that end a turn with the apology.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("normalization failed: {0}")]
    Normalize(#[from] NormalizeError),

    #[error("completion failed: {0}")]
    Completion(#[from] CompletionError),
}

/// Terminal state of one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The completion engine answered; the text was recorded as an assistant turn.
    Replied { text: String },
    /// The turn failed; the apology is sent instead.
    Apologized { reason: String },
}

impl TurnOutcome {
    /// Text delivered to the user for this outcome.
    pub fn reply_text(&self) -> &str {
        match self {
            TurnOutcome::Replied { text } => text,
            TurnOutcome::Apologized { .. } => APOLOGY_TEXT,
        }
    }

    pub fn is_reply(&self) -> bool {
        matches!(self, TurnOutcome::Replied { .. })
    }
}

/// Drives inbound events through the conversation store and completion provider.
///
/// Generic over the completion provider, the media source and the reply sink so
/// tests can substitute in-memory doubles.
pub struct SessionOrchestrator<P, M, R> {
    store: Arc<ConversationStore>,
    provider: P,
    media: M,
    replies: R,
}

impl<P, M, R> SessionOrchestrator<P, M, R>
where
    P: CompletionProvider,
    M: MediaSource,
    R: ReplySink,
{
    pub fn new(store: Arc<ConversationStore>, provider: P, media: M, replies: R) -> Self {
        Self {
            store,
            provider,
            media,
            replies,
        }
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    /// Process one event and deliver the outcome to the user.
    ///
    /// Delivery failures are logged and otherwise ignored: stored state is
    /// already final by the time the reply is sent.
    pub async fn handle_event(&self, event: &InboundEvent) -> TurnOutcome {
        let span = info_span!(
            "relay.event",
            user_id = %event.user_id,
            kind = event.payload.kind(),
        );

        async {
            let outcome = self.process_event(event).await;

            if let Err(e) = self
                .replies
                .send_reply(&event.reply_token, outcome.reply_text())
                .await
            {
                error!(error = %e, replied = outcome.is_reply(), "failed to deliver reply");
            }

            outcome
        }
        .instrument(span)
        .await
    }

    /// Run the turn protocol for one event without delivering anything.
    pub async fn process_event(&self, event: &InboundEvent) -> TurnOutcome {
        let handle = self.store.get_or_create(&event.user_id);
        let _turn = self.store.lock_turn(&handle).await;

        match self.run_turn(&handle, event).await {
            Ok(text) => TurnOutcome::Replied { text },
            Err(e) => {
                match &e {
                    TurnError::Normalize(inner) => {
                        warn!(error = %inner, "could not normalize inbound message");
                    }
                    TurnError::Completion(inner) if inner.is_transport() => {
                        warn!(provider = self.provider.name(), error = %inner, "completion transport failure");
                    }
                    TurnError::Completion(inner) => {
                        warn!(provider = self.provider.name(), error = %inner, "completion protocol failure");
                    }
                }
                TurnOutcome::Apologized {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn run_turn(
        &self,
        handle: &ConversationHandle,
        event: &InboundEvent,
    ) -> Result<String, TurnError> {
        let text = normalize(&self.media, &event.payload).await?;
        self.store.append(handle, Role::User, text).await;

        let history = self.store.snapshot(handle).await;
        let span = info_span!(
            "gen_ai.complete",
            gen_ai.system = self.provider.name(),
            turns = history.len(),
        );
        let started = Instant::now();
        let reply = self.provider.complete(&history).instrument(span).await?;
        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            reply_chars = reply.chars().count(),
            "completion received"
        );

        self.store
            .append(handle, Role::Assistant, reply.clone())
            .await;
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use relay_types::error::DeliveryError;
    use relay_types::event::MessagePayload;
    use relay_types::turn::Turn;

    use crate::normalize::media_ack_text;
    use relay_types::event::MediaKind;

    /// Scripted provider: pops one result per call; echoes when the script is empty.
    struct ScriptedProvider {
        script: Mutex<VecDeque<Result<String, CompletionError>>>,
        seen: Mutex<Vec<Vec<Turn>>>,
        delay: Duration,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Result<String, CompletionError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                seen: Mutex::new(Vec::new()),
                delay: Duration::ZERO,
            }
        }

        fn echo_with_delay(delay: Duration) -> Self {
            Self {
                script: Mutex::new(VecDeque::new()),
                seen: Mutex::new(Vec::new()),
                delay,
            }
        }
    }

    impl CompletionProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, history: &[Turn]) -> Result<String, CompletionError> {
            self.seen.lock().unwrap().push(history.to_vec());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(result) => result,
                None => {
                    let last = history.last().map(|t| t.content()).unwrap_or_default();
                    Ok(format!("echo:{last}"))
                }
            }
        }
    }

    struct FakeMedia {
        fail: bool,
    }

    impl MediaSource for FakeMedia {
        async fn fetch_media(&self, _media_ref: &str) -> Result<Vec<u8>, DeliveryError> {
            if self.fail {
                Err(DeliveryError::Request("connection reset".to_string()))
            } else {
                Ok(vec![1, 2, 3])
            }
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    impl ReplySink for RecordingSink {
        async fn send_reply(&self, reply_token: &str, text: &str) -> Result<(), DeliveryError> {
            self.sent
                .lock()
                .unwrap()
                .push((reply_token.to_string(), text.to_string()));
            if self.fail {
                Err(DeliveryError::Status {
                    status: 400,
                    body: "Invalid reply token".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    type TestOrchestrator = SessionOrchestrator<ScriptedProvider, FakeMedia, RecordingSink>;

    fn orchestrator(provider: ScriptedProvider) -> TestOrchestrator {
        SessionOrchestrator::new(
            Arc::new(ConversationStore::new("persona", None)),
            provider,
            FakeMedia { fail: false },
            RecordingSink::default(),
        )
    }

    fn text_event(user: &str, token: &str, text: &str) -> InboundEvent {
        InboundEvent {
            user_id: user.to_string(),
            reply_token: token.to_string(),
            payload: MessagePayload::Text {
                text: text.to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_successful_turn_records_and_replies() {
        let orch = orchestrator(ScriptedProvider::new(vec![Ok(
            "ลองนอนพักดูนะครับ".to_string()
        )]));

        let outcome = orch.handle_event(&text_event("U1", "r1", "ปวดหัว")).await;

        assert_eq!(
            outcome,
            TurnOutcome::Replied {
                text: "ลองนอนพักดูนะครับ".to_string()
            }
        );
        let handle = orch.store().get_or_create("U1");
        assert_eq!(
            orch.store().snapshot(&handle).await,
            vec![
                Turn::system("persona"),
                Turn::user("ปวดหัว"),
                Turn::assistant("ลองนอนพักดูนะครับ"),
            ]
        );
        assert_eq!(
            *orch.replies.sent.lock().unwrap(),
            vec![("r1".to_string(), "ลองนอนพักดูนะครับ".to_string())]
        );
    }

    #[tokio::test]
    async fn test_provider_sees_history_including_new_user_turn() {
        let orch = orchestrator(ScriptedProvider::new(vec![Ok("hi".to_string())]));
        orch.process_event(&text_event("U1", "r1", "hello")).await;

        let seen = orch.provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], vec![Turn::system("persona"), Turn::user("hello")]);
    }

    #[tokio::test]
    async fn test_sequential_events_alternate_roles() {
        let orch = orchestrator(ScriptedProvider::new(Vec::new()));
        let n = 5;
        for i in 0..n {
            let outcome = orch
                .process_event(&text_event("U1", &format!("r{i}"), &format!("q{i}")))
                .await;
            assert!(outcome.is_reply());
        }

        let handle = orch.store().get_or_create("U1");
        let turns = orch.store().snapshot(&handle).await;
        assert_eq!(turns.len(), 1 + 2 * n);
        assert_eq!(turns[0].role(), Role::System);
        for i in 0..n {
            assert_eq!(turns[1 + 2 * i], Turn::user(format!("q{i}")));
            assert_eq!(turns[2 + 2 * i], Turn::assistant(format!("echo:q{i}")));
        }
    }

    #[tokio::test]
    async fn test_completion_failure_keeps_user_turn_only() {
        let orch = orchestrator(ScriptedProvider::new(vec![Err(
            CompletionError::Protocol("choices array is empty".to_string()),
        )]));

        let outcome = orch.handle_event(&text_event("U1", "r1", "ปวดหัว")).await;

        assert!(!outcome.is_reply());
        assert_eq!(outcome.reply_text(), APOLOGY_TEXT);
        let handle = orch.store().get_or_create("U1");
        let turns = orch.store().snapshot(&handle).await;
        assert_eq!(turns.len(), 2);
        assert_eq!(turns.last(), Some(&Turn::user("ปวดหัว")));
        assert_eq!(
            *orch.replies.sent.lock().unwrap(),
            vec![("r1".to_string(), APOLOGY_TEXT.to_string())]
        );
    }

    #[tokio::test]
    async fn test_transport_failure_apologizes() {
        let orch = orchestrator(ScriptedProvider::new(vec![Err(CompletionError::Timeout(
            Duration::from_secs(30),
        ))]));

        let outcome = orch.process_event(&text_event("U1", "r1", "hi")).await;
        match outcome {
            TurnOutcome::Apologized { reason } => assert!(reason.contains("timed out")),
            other => panic!("expected apology, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_normalization_failure_appends_nothing() {
        let orch = SessionOrchestrator::new(
            Arc::new(ConversationStore::new("persona", None)),
            ScriptedProvider::new(Vec::new()),
            FakeMedia { fail: true },
            RecordingSink::default(),
        );
        let event = InboundEvent {
            user_id: "U1".to_string(),
            reply_token: "r1".to_string(),
            payload: MessagePayload::Image {
                media_ref: "m1".to_string(),
            },
        };

        let outcome = orch.handle_event(&event).await;

        assert_eq!(outcome.reply_text(), APOLOGY_TEXT);
        let handle = orch.store().get_or_create("U1");
        assert_eq!(orch.store().turn_count(&handle).await, 1);
        assert!(orch.provider.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_image_event_records_acknowledgment_template() {
        let orch = orchestrator(ScriptedProvider::new(vec![Ok("สวยมากครับ".to_string())]));
        let event = InboundEvent {
            user_id: "U1".to_string(),
            reply_token: "r1".to_string(),
            payload: MessagePayload::Image {
                media_ref: "m1".to_string(),
            },
        };

        orch.process_event(&event).await;

        let handle = orch.store().get_or_create("U1");
        let turns = orch.store().snapshot(&handle).await;
        assert_eq!(turns[1], Turn::user(media_ack_text(MediaKind::Image)));
    }

    #[tokio::test]
    async fn test_delivery_failure_does_not_touch_state() {
        let orch = SessionOrchestrator::new(
            Arc::new(ConversationStore::new("persona", None)),
            ScriptedProvider::new(vec![Ok("reply".to_string())]),
            FakeMedia { fail: false },
            RecordingSink {
                sent: Mutex::new(Vec::new()),
                fail: true,
            },
        );

        let outcome = orch.handle_event(&text_event("U1", "r1", "hi")).await;

        assert!(outcome.is_reply());
        let handle = orch.store().get_or_create("U1");
        assert_eq!(orch.store().turn_count(&handle).await, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_same_user_events_never_interleave() {
        let orch = Arc::new(orchestrator(ScriptedProvider::echo_with_delay(
            Duration::from_millis(10),
        )));

        let mut tasks = Vec::new();
        for i in 0..8 {
            let orch = Arc::clone(&orch);
            tasks.push(tokio::spawn(async move {
                orch.process_event(&text_event("U1", &format!("r{i}"), &format!("q{i}")))
                    .await
            }));
        }
        for task in tasks {
            assert!(task.await.unwrap().is_reply());
        }

        let handle = orch.store().get_or_create("U1");
        let turns = orch.store().snapshot(&handle).await;
        assert_eq!(turns.len(), 17);
        for pair in turns[1..].chunks(2) {
            assert_eq!(pair[0].role(), Role::User);
            assert_eq!(pair[1].role(), Role::Assistant);
            assert_eq!(pair[1].content(), format!("echo:{}", pair[0].content()));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_users_keep_isolated_histories() {
        let users = 16;
        let events_per_user = 10;
        let orch = Arc::new(orchestrator(ScriptedProvider::echo_with_delay(
            Duration::from_millis(1),
        )));

        let mut tasks = Vec::new();
        for u in 0..users {
            for i in 0..events_per_user {
                let orch = Arc::clone(&orch);
                tasks.push(tokio::spawn(async move {
                    orch.handle_event(&text_event(
                        &format!("U{u}"),
                        &format!("r{u}-{i}"),
                        &format!("U{u}:q{i}"),
                    ))
                    .await
                }));
            }
        }
        for task in tasks {
            assert!(task.await.unwrap().is_reply());
        }

        assert_eq!(orch.store().len(), users);
        for u in 0..users {
            let handle = orch.store().get(&format!("U{u}")).expect("conversation exists");
            let turns = orch.store().snapshot(&handle).await;
            assert_eq!(turns.len(), 1 + 2 * events_per_user);
            assert_eq!(turns[0], Turn::system("persona"));

            let prefix = format!("U{u}:");
            for pair in turns[1..].chunks(2) {
                assert_eq!(pair[0].role(), Role::User);
                assert!(pair[0].content().starts_with(&prefix));
                assert_eq!(pair[1].role(), Role::Assistant);
                assert_eq!(pair[1].content(), format!("echo:{}", pair[0].content()));
            }
        }
        assert_eq!(
            orch.replies.sent.lock().unwrap().len(),
            users * events_per_user
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_different_users_proceed_in_parallel() {
        let orch = Arc::new(orchestrator(ScriptedProvider::echo_with_delay(
            Duration::from_millis(200),
        )));

        let started = Instant::now();
        let mut tasks = Vec::new();
        for i in 0..4 {
            let orch = Arc::clone(&orch);
            tasks.push(tokio::spawn(async move {
                orch.process_event(&text_event(&format!("U{i}"), "r", "hi"))
                    .await
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert!(started.elapsed() < Duration::from_millis(700));
        assert_eq!(orch.store().len(), 4);
    }
}
