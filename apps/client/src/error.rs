use thiserror::Error;

/// Errors surfaced by the gateway client and the interview relay.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response format: {0}")]
    UnexpectedResponse(String),

    #[error("Voice session error: {0}")]
    Voice(String),

    #[error("Invalid session state: {0}")]
    InvalidState(String),
}
