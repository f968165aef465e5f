use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use crate::errors::AppError;
use crate::state::AppState;

/// POST /voice/call
///
/// Relays the platform's status and JSON body as-is.
pub async fn handle_create_call(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let voice = state.voice.as_ref().ok_or_else(|| {
        AppError::ServiceUnavailable("Voice calls are not configured".to_string())
    })?;
    let Json(request) = body?;

    let call = voice.create_web_call(&request).await?;
    let status = StatusCode::from_u16(call.status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    Ok((status, Json(call.body)))
}
