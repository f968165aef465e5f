mod config;
mod db;
mod errors;
mod feedback;
mod llm_client;
mod models;
mod resume;
mod routes;
mod state;
mod transcript;
mod voice;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::feedback::FeedbackGenerator;
use crate::llm_client::LlmClient;
use crate::resume::archive::ResumeArchive;
use crate::routes::build_router;
use crate::state::AppState;
use crate::transcript::{InMemoryTranscriptStore, PgTranscriptStore, TranscriptStore};
use crate::voice::VoiceClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={level},interview_client={level},tower_http={level}",
                env!("CARGO_CRATE_NAME"),
                level = &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting mock interview API v{}", env!("CARGO_PKG_VERSION"));

    let store: Arc<dyn TranscriptStore> = match &config.database_url {
        Some(url) => Arc::new(PgTranscriptStore::new(create_pool(url).await?)),
        None => {
            warn!("DATABASE_URL not set; transcripts are kept in memory and lost on restart");
            Arc::new(InMemoryTranscriptStore::new())
        }
    };
    info!("Transcript store: {}", store.backend());

    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let feedback = FeedbackGenerator::new(
        store.clone(),
        Arc::new(llm),
        Duration::from_secs(config.llm_timeout_secs),
    );

    let archive = match &config.s3 {
        Some(s3) => {
            info!("Resume archive enabled (bucket: {})", s3.bucket);
            Some(ResumeArchive::connect(s3).await)
        }
        None => {
            info!("Resume archive disabled");
            None
        }
    };

    let voice = match &config.vapi_api_key {
        Some(key) => Some(VoiceClient::new(key.clone())?),
        None => {
            warn!("VAPI_API_KEY not set; /voice/call will answer 503");
            None
        }
    };

    let state = AppState {
        store,
        feedback,
        archive,
        voice,
        config: config.clone(),
    };

    // The browser client is served from another origin.
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
