use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const STATUS_IN_PROGRESS: &str = "in-progress";
pub const STATUS_COMPLETED: &str = "completed";

/// One interview attempt. Created lazily by the first message append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub feedback: Option<String>,
    pub feedback_generated_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            status: STATUS_IN_PROGRESS.to_string(),
            created_at: Utc::now(),
            feedback: None,
            feedback_generated_at: None,
        }
    }
}

/// One recorded utterance. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Insertion sequence; breaks ties between equal timestamps.
    #[serde(skip)]
    pub id: i64,
    #[serde(skip)]
    pub interview_id: String,
    pub role: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}
