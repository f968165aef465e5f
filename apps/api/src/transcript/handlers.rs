use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::AppError;
use crate::models::interview::Message;
use crate::state::AppState;
use crate::transcript::NewMessage;

/// Every field is optional on the wire so a missing one surfaces as a 400 with our
/// own message instead of a deserialisation rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveMessageRequest {
    pub interview_id: Option<String>,
    pub role: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SaveMessageResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationResponse {
    pub interview_id: String,
    pub messages: Vec<Message>,
}

/// POST /conversation/save
pub async fn handle_save(
    State(state): State<AppState>,
    body: Result<Json<SaveMessageRequest>, JsonRejection>,
) -> Result<Json<SaveMessageResponse>, AppError> {
    let Json(req) = body?;
    let message = NewMessage::new(
        req.interview_id.as_deref().unwrap_or_default(),
        req.role.as_deref(),
        req.text.as_deref().unwrap_or_default(),
    )?;

    let stored = state.store.append(message).await?;
    debug!(
        "Saved {} message #{} for interview {}",
        stored.role, stored.id, stored.interview_id
    );
    Ok(Json(SaveMessageResponse { success: true }))
}

/// GET /conversation/:interview_id
pub async fn handle_list(
    State(state): State<AppState>,
    Path(interview_id): Path<String>,
) -> Result<Json<ConversationResponse>, AppError> {
    let messages = state.store.list_messages(&interview_id).await?;
    Ok(Json(ConversationResponse {
        interview_id,
        messages,
    }))
}
