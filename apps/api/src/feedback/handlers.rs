use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use interview_client::report::{render, RenderedReport};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateFeedbackRequest {
    pub interview_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateFeedbackResponse {
    pub feedback: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFeedbackResponse {
    pub interview_id: String,
    pub status: String,
    pub feedback: String,
    pub feedback_generated_at: Option<DateTime<Utc>>,
    pub report: RenderedReport,
}

/// POST /feedback/generate
pub async fn handle_generate(
    State(state): State<AppState>,
    body: Result<Json<GenerateFeedbackRequest>, JsonRejection>,
) -> Result<Json<GenerateFeedbackResponse>, AppError> {
    let Json(req) = body?;
    let interview_id = req
        .interview_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::Validation("interviewId is required".to_string()))?;

    let feedback = state.feedback.generate(&interview_id).await?;
    Ok(Json(GenerateFeedbackResponse { feedback }))
}

/// GET /feedback/:interview_id
///
/// Stored feedback plus its rendered sections.
pub async fn handle_get_feedback(
    State(state): State<AppState>,
    Path(interview_id): Path<String>,
) -> Result<Json<StoredFeedbackResponse>, AppError> {
    let session = state
        .store
        .get_session(&interview_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Interview {interview_id} not found")))?;

    let feedback = session.feedback.ok_or_else(|| {
        AppError::NotFound(format!("No feedback generated yet for interview {interview_id}"))
    })?;

    Ok(Json(StoredFeedbackResponse {
        interview_id: session.id,
        status: session.status,
        report: render(&feedback),
        feedback,
        feedback_generated_at: session.feedback_generated_at,
    }))
}
