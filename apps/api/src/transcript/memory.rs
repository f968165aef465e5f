use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::models::interview::{Message, Session, STATUS_COMPLETED};
use crate::transcript::{no_messages, sort_messages, NewMessage, StoreError, TranscriptStore};

/// Process-local transcript store. Contents are lost on restart.
#[derive(Default)]
pub struct InMemoryTranscriptStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    sessions: HashMap<String, SessionEntry>,
    next_id: i64,
}

struct SessionEntry {
    session: Session,
    messages: Vec<Message>,
}

impl SessionEntry {
    fn new(session_id: &str) -> Self {
        Self {
            session: Session::new(session_id),
            messages: Vec::new(),
        }
    }
}

impl InMemoryTranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TranscriptStore for InMemoryTranscriptStore {
    async fn append(&self, message: NewMessage) -> Result<Message, StoreError> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let id = inner.next_id;

        let entry = inner
            .sessions
            .entry(message.session_id.clone())
            .or_insert_with(|| {
                debug!("Creating interview {} on first message", message.session_id);
                SessionEntry::new(&message.session_id)
            });

        let stored = Message {
            id,
            interview_id: message.session_id,
            role: message.role,
            text: message.text,
            created_at: Utc::now(),
        };
        entry.messages.push(stored.clone());
        Ok(stored)
    }

    async fn list_messages(&self, session_id: &str) -> Result<Vec<Message>, StoreError> {
        let inner = self.inner.read().await;
        let mut messages = inner
            .sessions
            .get(session_id)
            .map(|entry| entry.messages.clone())
            .unwrap_or_default();

        if messages.is_empty() {
            return Err(no_messages(session_id));
        }
        sort_messages(&mut messages);
        Ok(messages)
    }

    async fn set_feedback(&self, session_id: &str, feedback: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let entry = inner
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionEntry::new(session_id));

        entry.session.feedback = Some(feedback.to_string());
        entry.session.feedback_generated_at = Some(Utc::now());
        entry.session.status = STATUS_COMPLETED.to_string();
        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<Session>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .sessions
            .get(session_id)
            .map(|entry| entry.session.clone()))
    }

    fn backend(&self) -> &'static str {
        "in-memory"
    }
}
