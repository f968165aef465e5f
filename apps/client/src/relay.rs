//! Voice Session Relay — drives one mock interview from résumé upload to feedback.
//!
//! State machine: `Idle → Preparing → Active → Completed | Failed`.
//!
//! While `Active`, exactly one transcript listener is registered with the voice SDK. It is
//! owned by a `ListenerGuard`, so stopping, resetting or dropping the session always
//! deregisters it. Final transcript events go through a channel to a single forwarding task,
//! which appends them to the gateway one at a time in arrival order.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ClientError;
use crate::gateway::InterviewGateway;

pub type ListenerId = u64;
pub type Listener = Arc<dyn Fn(&VoiceEvent) + Send + Sync>;

// ────────────────────────────────────────────────────────────────────────────
// Voice SDK seam
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptType {
    Partial,
    Final,
}

/// Event emitted by the voice SDK. Only transcripts matter to the relay.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum VoiceEvent {
    Transcript {
        role: String,
        transcript: String,
        #[serde(rename = "transcriptType")]
        transcript_type: TranscriptType,
    },
    #[serde(other)]
    Other,
}

/// Opaque voice-session capability (start, stop, event listeners).
#[async_trait]
pub trait VoiceSdk: Send + Sync {
    async fn start(&self, assistant_id: &str, variables: serde_json::Value)
        -> Result<(), ClientError>;

    async fn stop(&self) -> Result<(), ClientError>;

    fn add_listener(&self, listener: Listener) -> ListenerId;

    fn remove_listener(&self, id: ListenerId);
}

/// Owned registration of a listener. Dropping it removes the listener from the SDK.
pub struct ListenerGuard {
    sdk: Arc<dyn VoiceSdk>,
    id: ListenerId,
}

impl ListenerGuard {
    pub fn register(sdk: Arc<dyn VoiceSdk>, listener: Listener) -> Self {
        let id = sdk.add_listener(listener);
        Self { sdk, id }
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.sdk.remove_listener(self.id);
        debug!("Transcript listener {} removed", self.id);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Transcript forwarding
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct Utterance {
    role: String,
    text: String,
}

/// Listener registration plus the task that appends its utterances.
struct ActiveRelay {
    guard: ListenerGuard,
    shutdown: oneshot::Sender<()>,
    forwarder: JoinHandle<()>,
}

impl ActiveRelay {
    fn spawn(
        sdk: Arc<dyn VoiceSdk>,
        gateway: Arc<dyn InterviewGateway>,
        session_id: String,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (shutdown, shutdown_rx) = oneshot::channel();

        let listener: Listener = Arc::new(move |event: &VoiceEvent| {
            if let Some(utterance) = final_utterance(event) {
                // Send only fails once the forwarder has shut down.
                let _ = tx.send(utterance);
            }
        });
        let guard = ListenerGuard::register(sdk, listener);
        let forwarder = tokio::spawn(forward(gateway, session_id, rx, shutdown_rx));

        Self {
            guard,
            shutdown,
            forwarder,
        }
    }

    /// Deregisters the listener, then waits until every queued utterance has been sent.
    async fn finish(self) {
        let ActiveRelay {
            guard,
            shutdown,
            forwarder,
        } = self;
        drop(guard);
        let _ = shutdown.send(());
        if let Err(e) = forwarder.await {
            warn!("Transcript forwarder ended abnormally: {e}");
        }
    }
}

fn final_utterance(event: &VoiceEvent) -> Option<Utterance> {
    match event {
        VoiceEvent::Transcript {
            role,
            transcript,
            transcript_type: TranscriptType::Final,
        } => Some(Utterance {
            role: role.clone(),
            text: transcript.clone(),
        }),
        _ => None,
    }
}

async fn forward(
    gateway: Arc<dyn InterviewGateway>,
    session_id: String,
    mut rx: mpsc::UnboundedReceiver<Utterance>,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            biased;
            next = rx.recv() => match next {
                Some(utterance) => save(gateway.as_ref(), &session_id, utterance).await,
                None => return,
            },
            _ = &mut shutdown => break,
        }
    }

    rx.close();
    while let Some(utterance) = rx.recv().await {
        save(gateway.as_ref(), &session_id, utterance).await;
    }
}

async fn save(gateway: &dyn InterviewGateway, session_id: &str, utterance: Utterance) {
    match gateway
        .save_message(session_id, &utterance.role, &utterance.text)
        .await
    {
        Ok(()) => debug!("Saved {} turn for session {session_id}", utterance.role),
        Err(e) => warn!("Failed to save transcript turn for session {session_id}: {e}"),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Session state machine
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    Preparing { session_id: String },
    Active { session_id: String },
    Completed { session_id: String, feedback: String },
    Failed { reason: String },
}

/// One interview attempt. Not `Clone`: it owns the listener registration.
pub struct InterviewSession {
    sdk: Arc<dyn VoiceSdk>,
    gateway: Arc<dyn InterviewGateway>,
    assistant_id: String,
    state: SessionState,
    relay: Option<ActiveRelay>,
}

impl InterviewSession {
    pub fn new(
        sdk: Arc<dyn VoiceSdk>,
        gateway: Arc<dyn InterviewGateway>,
        assistant_id: impl Into<String>,
    ) -> Self {
        Self {
            sdk,
            gateway,
            assistant_id: assistant_id.into(),
            state: SessionState::Idle,
            relay: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn session_id(&self) -> Option<&str> {
        match &self.state {
            SessionState::Preparing { session_id }
            | SessionState::Active { session_id }
            | SessionState::Completed { session_id, .. } => Some(session_id),
            SessionState::Idle | SessionState::Failed { .. } => None,
        }
    }

    /// Uploads the résumé, starts the voice session and begins relaying transcripts.
    pub async fn start(&mut self, file_name: &str, resume: Vec<u8>) -> Result<(), ClientError> {
        if self.state != SessionState::Idle {
            return Err(ClientError::InvalidState(format!(
                "cannot start from {:?}",
                self.state
            )));
        }

        let uploaded = self.gateway.upload_resume(file_name, resume).await;
        let resume_text = match uploaded {
            Ok(text) => text,
            Err(e) => return Err(self.fail(e)),
        };

        let session_id = Uuid::new_v4().to_string();
        info!("Interview session {session_id} preparing");
        self.state = SessionState::Preparing {
            session_id: session_id.clone(),
        };

        let started = self
            .sdk
            .start(&self.assistant_id, json!({ "resume": resume_text }))
            .await;
        if let Err(e) = started {
            return Err(self.fail(e));
        }

        // A leftover registration would double every append.
        if let Some(previous) = self.relay.take() {
            previous.finish().await;
        }
        self.relay = Some(ActiveRelay::spawn(
            self.sdk.clone(),
            self.gateway.clone(),
            session_id.clone(),
        ));

        info!("Interview session {session_id} active");
        self.state = SessionState::Active { session_id };
        Ok(())
    }

    /// Stops the voice session, flushes the transcript and requests feedback.
    pub async fn stop(&mut self) -> Result<String, ClientError> {
        let session_id = match &self.state {
            SessionState::Active { session_id } => session_id.clone(),
            other => {
                return Err(ClientError::InvalidState(format!(
                    "cannot stop from {other:?}"
                )))
            }
        };

        let stopped = self.sdk.stop().await;
        if let Some(relay) = self.relay.take() {
            relay.finish().await;
        }
        if let Err(e) = stopped {
            return Err(self.fail(e));
        }

        let generated = self.gateway.generate_feedback(&session_id).await;
        match generated {
            Ok(feedback) => {
                info!("Interview session {session_id} completed");
                self.state = SessionState::Completed {
                    session_id,
                    feedback: feedback.clone(),
                };
                Ok(feedback)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Back to `Idle` from any state, releasing the listener if one is held.
    pub async fn reset(&mut self) {
        if let Some(relay) = self.relay.take() {
            relay.finish().await;
        }
        self.state = SessionState::Idle;
    }

    fn fail(&mut self, error: ClientError) -> ClientError {
        warn!("Interview session failed: {error}");
        self.state = SessionState::Failed {
            reason: error.to_string(),
        };
        error
    }
}
