use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::resume::extract::ResumeFormat;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub text: String,
}

struct UploadedFile {
    file_name: String,
    bytes: Bytes,
}

/// POST /resume/upload
///
/// Extracts plain text from an uploaded PDF or DOCX résumé.
pub async fn handle_upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let multipart = multipart.map_err(|e| AppError::Validation(e.body_text()))?;
    let upload = read_resume_field(multipart)
        .await?
        .ok_or_else(|| AppError::Validation("No file uploaded".to_string()))?;

    // Reject before any parser runs.
    let format = ResumeFormat::from_file_name(&upload.file_name)?;

    let bytes = upload.bytes.clone();
    let text = tokio::task::spawn_blocking(move || format.extract(&bytes))
        .await
        .map_err(|e| AppError::Parse(format!("extraction task failed: {e}")))??;

    if text.trim().is_empty() {
        warn!("Resume '{}' produced no text", upload.file_name);
    }
    info!(
        "Resume '{}' parsed ({} chars)",
        upload.file_name,
        text.len()
    );

    if let Some(archive) = &state.archive {
        if let Err(e) = archive.store(format, upload.bytes).await {
            warn!("Resume archive failed (upload still succeeds): {e}");
        }
    }

    Ok(Json(UploadResponse { text }))
}

/// Returns the first field that carries a file. The browser client names it `resume`;
/// plain form fields are skipped.
async fn read_resume_field(mut multipart: Multipart) -> Result<Option<UploadedFile>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read uploaded file: {e}")))?;

        return Ok(Some(UploadedFile { file_name, bytes }));
    }
    Ok(None)
}
