pub mod health;

use std::any::Any;

use axum::{
    extract::DefaultBodyLimit,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::catch_panic::CatchPanicLayer;

use crate::errors::AppError;
use crate::feedback::handlers as feedback;
use crate::resume::handlers as resume;
use crate::state::AppState;
use crate::transcript::handlers as transcript;
use crate::voice::handlers as voice;

pub fn build_router(state: AppState) -> Router {
    let max_upload_bytes = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health::health_handler))
        .route("/resume/upload", post(resume::handle_upload))
        .route("/conversation/save", post(transcript::handle_save))
        .route("/conversation/:interview_id", get(transcript::handle_list))
        .route("/feedback/generate", post(feedback::handle_generate))
        .route("/feedback/:interview_id", get(feedback::handle_get_feedback))
        .route("/voice/call", post(voice::handle_create_call))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

/// GET /
async fn index_handler() -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "Mock interview API is running",
        "endpoints": {
            "resume": "/resume/upload",
            "conversation": "/conversation",
            "feedback": "/feedback",
            "voice": "/voice/call"
        }
    }))
}

async fn not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    AppError::Internal(anyhow::anyhow!("handler panicked: {detail}")).into_response()
}
