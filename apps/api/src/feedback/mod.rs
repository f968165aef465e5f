//! Feedback Generator — turns an interview transcript into the six-section evaluation.
//!
//! Pipeline: list messages → role-prefixed transcript → fixed prompt → LLM → best-effort
//! persist → raw text back to the caller. The LLM sits behind `FeedbackModel` so the
//! pipeline can run against a fake in tests.

pub mod generator;
pub mod handlers;
pub mod prompts;

use async_trait::async_trait;
use thiserror::Error;

use crate::llm_client::{LlmClient, LlmError};
use crate::transcript::StoreError;

pub use generator::FeedbackGenerator;

#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("No messages found for interview {0}")]
    NoMessages(String),

    #[error("Interview {0} has messages but no usable transcript text")]
    EmptyTranscript(String),

    #[error("LLM failure: {0}")]
    Upstream(#[from] LlmError),

    #[error("Store failure: {0}")]
    Store(StoreError),
}

/// Prompt in, evaluation text out.
#[async_trait]
pub trait FeedbackModel: Send + Sync {
    async fn complete(&self, prompt: &str, system: &str) -> Result<String, LlmError>;
}

#[async_trait]
impl FeedbackModel for LlmClient {
    async fn complete(&self, prompt: &str, system: &str) -> Result<String, LlmError> {
        self.call_text(prompt, system).await
    }
}
