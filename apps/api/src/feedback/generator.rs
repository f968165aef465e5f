use std::sync::Arc;
use std::time::Duration;

use interview_client::report::missing_labels;
use tracing::{debug, info, warn};

use crate::feedback::prompts::{FEEDBACK_PROMPT_TEMPLATE, FEEDBACK_SYSTEM};
use crate::feedback::{FeedbackError, FeedbackModel};
use crate::llm_client::LlmError;
use crate::models::interview::Message;
use crate::transcript::{StoreError, TranscriptStore};

const UNKNOWN_ROLE: &str = "UNKNOWN";

/// Runs the transcript → LLM → persist pipeline for one interview at a time.
///
/// Calls for the same interview may overlap; the last `set_feedback` wins.
#[derive(Clone)]
pub struct FeedbackGenerator {
    store: Arc<dyn TranscriptStore>,
    model: Arc<dyn FeedbackModel>,
    timeout: Duration,
}

impl FeedbackGenerator {
    pub fn new(
        store: Arc<dyn TranscriptStore>,
        model: Arc<dyn FeedbackModel>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            model,
            timeout,
        }
    }

    /// Generates, persists (best effort) and returns the evaluation for `session_id`.
    pub async fn generate(&self, session_id: &str) -> Result<String, FeedbackError> {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Err(FeedbackError::Validation("interviewId is required".to_string()));
        }

        let messages = match self.store.list_messages(session_id).await {
            Ok(messages) => messages,
            Err(StoreError::NotFound(_)) => {
                return Err(FeedbackError::NoMessages(session_id.to_string()))
            }
            Err(e) => return Err(FeedbackError::Store(e)),
        };

        let transcript = build_transcript(&messages);
        if transcript.trim().is_empty() {
            return Err(FeedbackError::EmptyTranscript(session_id.to_string()));
        }
        debug!(
            "Transcript for interview {session_id}: {} messages, {} chars",
            messages.len(),
            transcript.len()
        );

        let prompt = FEEDBACK_PROMPT_TEMPLATE.replace("{transcript}", &transcript);
        let feedback = tokio::time::timeout(
            self.timeout,
            self.model.complete(&prompt, FEEDBACK_SYSTEM),
        )
        .await
        .map_err(|_| LlmError::Timeout {
            secs: self.timeout.as_secs(),
        })??;

        let missing = missing_labels(&feedback);
        if !missing.is_empty() {
            warn!(
                "Feedback for interview {session_id} is missing sections [{}]; they will not render",
                missing
                    .iter()
                    .map(|kind| kind.label())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        // Best effort: the caller gets the text even when the durable copy fails.
        if let Err(e) = self.store.set_feedback(session_id, &feedback).await {
            warn!("Failed to persist feedback for interview {session_id}: {e}");
        }

        info!(
            "Feedback generated for interview {session_id} ({} chars)",
            feedback.len()
        );
        Ok(feedback)
    }
}

/// One `ROLE: text` line per message with usable text, in the order given.
/// A blank role renders as `UNKNOWN`.
pub fn build_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .filter(|m| !m.text.trim().is_empty())
        .map(|m| {
            let role = m.role.trim();
            let role = if role.is_empty() {
                UNKNOWN_ROLE.to_string()
            } else {
                role.to_uppercase()
            };
            format!("{role}: {}\n", m.text)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;

    use crate::models::interview::Session;
    use crate::transcript::{InMemoryTranscriptStore, NewMessage};

    const SIX_SECTIONS: &str = "Overall Score: 7\n\nStrengths:\n- Clear\n\nWeaknesses:\n- Brief\n\nCommunication Skills:\nGood.\n\nTechnical Understanding:\nSolid.\n\nFinal Recommendation:\nHire";

    /// Records prompts and answers with a numbered six-section report.
    #[derive(Default)]
    struct FakeModel {
        prompts: Mutex<Vec<String>>,
        calls: AtomicUsize,
        fail: bool,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl FeedbackModel for FakeModel {
        async fn complete(&self, prompt: &str, _system: &str) -> Result<String, LlmError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.prompts.lock().unwrap().push(prompt.to_string());
            if self.fail {
                return Err(LlmError::Api {
                    status: 429,
                    message: "quota exceeded".to_string(),
                });
            }
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(SIX_SECTIONS.replace("Overall Score: 7", &format!("Overall Score: {n}")))
        }
    }

    /// Delegates to the in-memory store but refuses to persist feedback.
    #[derive(Default)]
    struct ReadOnlyFeedbackStore(InMemoryTranscriptStore);

    #[async_trait]
    impl TranscriptStore for ReadOnlyFeedbackStore {
        async fn append(&self, message: NewMessage) -> Result<Message, StoreError> {
            self.0.append(message).await
        }

        async fn list_messages(&self, session_id: &str) -> Result<Vec<Message>, StoreError> {
            self.0.list_messages(session_id).await
        }

        async fn set_feedback(&self, _session_id: &str, _feedback: &str) -> Result<(), StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolClosed))
        }

        async fn get_session(&self, session_id: &str) -> Result<Option<Session>, StoreError> {
            self.0.get_session(session_id).await
        }

        fn backend(&self) -> &'static str {
            "read-only"
        }
    }

    async fn seed(store: &dyn TranscriptStore, session: &str, turns: &[(&str, &str)]) {
        for (role, text) in turns {
            store
                .append(NewMessage::new(session, Some(role), text).unwrap())
                .await
                .unwrap();
        }
    }

    fn generator(store: Arc<dyn TranscriptStore>, model: Arc<FakeModel>) -> FeedbackGenerator {
        FeedbackGenerator::new(store, model, Duration::from_secs(5))
    }

    fn message(role: &str, text: &str) -> Message {
        Message {
            id: 0,
            interview_id: "s1".to_string(),
            role: role.to_string(),
            text: text.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_build_transcript_prefixes_uppercased_roles() {
        let transcript = build_transcript(&[
            message("user", "I have 5 years experience"),
            message("assistant", "Tell me about a project"),
        ]);
        assert_eq!(
            transcript,
            "USER: I have 5 years experience\nASSISTANT: Tell me about a project\n"
        );
    }

    #[test]
    fn test_build_transcript_unknown_role_and_blank_text() {
        let transcript = build_transcript(&[message("", "hello"), message("user", "   ")]);
        assert_eq!(transcript, "UNKNOWN: hello\n");
    }

    #[tokio::test]
    async fn test_two_turn_scenario_sends_transcript_and_returns_text_verbatim() {
        let store = Arc::new(InMemoryTranscriptStore::new());
        seed(
            store.as_ref(),
            "s1",
            &[
                ("user", "I have 5 years experience"),
                ("assistant", "Tell me about a project"),
            ],
        )
        .await;
        let model = Arc::new(FakeModel::default());

        let feedback = generator(store.clone(), model.clone())
            .generate("s1")
            .await
            .unwrap();

        assert_eq!(feedback, SIX_SECTIONS.replace("Overall Score: 7", "Overall Score: 1"));
        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0]
            .ends_with("USER: I have 5 years experience\nASSISTANT: Tell me about a project\n"));

        let session = store.get_session("s1").await.unwrap().unwrap();
        assert_eq!(session.feedback.as_deref(), Some(feedback.as_str()));
    }

    #[tokio::test]
    async fn test_no_messages_is_distinct_from_empty_transcript() {
        let store = Arc::new(InMemoryTranscriptStore::new());
        seed(store.as_ref(), "blank", &[("user", " "), ("assistant", "\n")]).await;
        let model = Arc::new(FakeModel::default());
        let generator = generator(store, model.clone());

        let none = generator.generate("missing").await.unwrap_err();
        assert!(matches!(none, FeedbackError::NoMessages(ref id) if id == "missing"));

        let empty = generator.generate("blank").await.unwrap_err();
        assert!(matches!(empty, FeedbackError::EmptyTranscript(ref id) if id == "blank"));

        assert!(model.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_session_id_is_validation_error() {
        let store = Arc::new(InMemoryTranscriptStore::new());
        let err = generator(store, Arc::new(FakeModel::default()))
            .generate("  ")
            .await
            .unwrap_err();
        assert!(matches!(err, FeedbackError::Validation(_)));
    }

    #[tokio::test]
    async fn test_llm_failure_is_upstream_and_nothing_is_persisted() {
        let store = Arc::new(InMemoryTranscriptStore::new());
        seed(store.as_ref(), "s1", &[("user", "hello")]).await;
        let model = Arc::new(FakeModel {
            fail: true,
            ..Default::default()
        });

        let err = generator(store.clone(), model).generate("s1").await.unwrap_err();
        assert!(matches!(err, FeedbackError::Upstream(LlmError::Api { status: 429, .. })));

        let session = store.get_session("s1").await.unwrap().unwrap();
        assert!(session.feedback.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_llm_times_out_as_upstream() {
        let store = Arc::new(InMemoryTranscriptStore::new());
        seed(store.as_ref(), "s1", &[("user", "hello")]).await;
        let model = Arc::new(FakeModel {
            delay: Some(Duration::from_secs(30)),
            ..Default::default()
        });

        let err = FeedbackGenerator::new(store, model, Duration::from_secs(1))
            .generate("s1")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FeedbackError::Upstream(LlmError::Timeout { secs: 1 })
        ));
    }

    #[tokio::test]
    async fn test_persistence_failure_still_returns_feedback() {
        let store = Arc::new(ReadOnlyFeedbackStore::default());
        seed(store.as_ref(), "s1", &[("user", "hello")]).await;

        let feedback = generator(store, Arc::new(FakeModel::default()))
            .generate("s1")
            .await
            .unwrap();
        assert!(feedback.starts_with("Overall Score: 1"));
    }

    #[tokio::test]
    async fn test_repeat_generation_overwrites_stored_feedback() {
        let store = Arc::new(InMemoryTranscriptStore::new());
        seed(store.as_ref(), "s1", &[("user", "hello")]).await;
        let generator = generator(store.clone(), Arc::new(FakeModel::default()));

        let first = generator.generate("s1").await.unwrap();
        let second = generator.generate("s1").await.unwrap();

        assert_ne!(first, second);
        for text in [&first, &second] {
            assert!(missing_labels(text).is_empty());
        }
        let session = store.get_session("s1").await.unwrap().unwrap();
        assert_eq!(session.feedback.as_deref(), Some(second.as_str()));
    }
}
