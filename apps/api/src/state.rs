use std::sync::Arc;

use crate::config::Config;
use crate::feedback::FeedbackGenerator;
use crate::resume::archive::ResumeArchive;
use crate::transcript::TranscriptStore;
use crate::voice::VoiceClient;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Postgres or in-memory, chosen at start-up from `DATABASE_URL`.
    pub store: Arc<dyn TranscriptStore>,
    pub feedback: FeedbackGenerator,
    /// `None` when S3 is not configured; uploads are then parsed but not kept.
    pub archive: Option<ResumeArchive>,
    pub voice: Option<VoiceClient>,
    pub config: Config,
}
