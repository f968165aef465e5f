//! Voice call proxy. The browser never sees the voice platform key; it asks us to open
//! the web call and gets the platform's JSON back.

pub mod handlers;

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

const WEB_CALL_URL: &str = "https://api.vapi.ai/call/web";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Voice platform answered {status} with a non-JSON body")]
    InvalidResponse { status: u16 },
}

/// Response relayed back to the browser unchanged.
#[derive(Debug)]
pub struct WebCall {
    pub status: StatusCode,
    pub body: Value,
}

#[derive(Clone)]
pub struct VoiceClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl VoiceClient {
    pub fn new(api_key: String) -> Result<Self, VoiceError> {
        Self::with_endpoint(api_key, WEB_CALL_URL.to_string())
    }

    pub fn with_endpoint(api_key: String, endpoint: String) -> Result<Self, VoiceError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key,
            endpoint,
        })
    }

    /// Forwards `request` as the web-call body and returns whatever JSON comes back.
    pub async fn create_web_call(&self, request: &Value) -> Result<WebCall, VoiceError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;
        let body: Value = serde_json::from_slice(&bytes).map_err(|_| VoiceError::InvalidResponse {
            status: status.as_u16(),
        })?;

        if status.is_success() {
            debug!("Voice web call created ({status})");
        } else {
            warn!("Voice platform rejected web call: {status}");
        }
        Ok(WebCall { status, body })
    }
}
