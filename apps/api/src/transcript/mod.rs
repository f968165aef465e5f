//! Transcript Store — append-only per-interview message log.
//!
//! Two backends share one contract:
//! - `PgTranscriptStore`: Postgres via sqlx (production).
//! - `InMemoryTranscriptStore`: process-local, used without `DATABASE_URL` and in tests.
//!
//! Appending to an unknown interview creates it. Reads always come back sorted by
//! `(created_at, id)` whatever the backend managed to do natively.

pub mod handlers;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::interview::{Message, Session};

pub use memory::InMemoryTranscriptStore;
pub use postgres::PgTranscriptStore;

const DEFAULT_ROLE: &str = "user";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A validated message ready to append.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub session_id: String,
    pub role: String,
    pub text: String,
}

impl NewMessage {
    /// Rejects a blank session id or empty text. A missing or blank role becomes `"user"`.
    pub fn new(session_id: &str, role: Option<&str>, text: &str) -> Result<Self, StoreError> {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Err(StoreError::Validation("interviewId is required".to_string()));
        }
        if text.is_empty() {
            return Err(StoreError::Validation("text is required".to_string()));
        }
        let role = role
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_ROLE);

        Ok(Self {
            session_id: session_id.to_string(),
            role: role.to_string(),
            text: text.to_string(),
        })
    }
}

/// Storage contract for interview sessions and their messages.
///
/// Carried in `AppState` as `Arc<dyn TranscriptStore>`.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Appends one message, creating the session record if it does not exist yet.
    async fn append(&self, message: NewMessage) -> Result<Message, StoreError>;

    /// All messages of a session in timestamp order. `NotFound` when there are none.
    async fn list_messages(&self, session_id: &str) -> Result<Vec<Message>, StoreError>;

    /// Upserts the feedback text, its generation time, and the completed status.
    async fn set_feedback(&self, session_id: &str, feedback: &str) -> Result<(), StoreError>;

    async fn get_session(&self, session_id: &str) -> Result<Option<Session>, StoreError>;

    /// Short backend name for start-up logging.
    fn backend(&self) -> &'static str;
}

pub(crate) fn no_messages(session_id: &str) -> StoreError {
    StoreError::NotFound(format!("No messages found for interview {session_id}"))
}

/// Orders by timestamp, falling back to insertion sequence on ties.
pub(crate) fn sort_messages(messages: &mut [Message]) {
    messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
}
