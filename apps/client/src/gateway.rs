//! Typed HTTP client for the interview API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::ClientError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The three gateway calls the interview flow needs.
#[async_trait]
pub trait InterviewGateway: Send + Sync {
    /// Uploads a résumé file and returns its extracted text.
    async fn upload_resume(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, ClientError>;

    /// Appends one transcript turn to the interview.
    async fn save_message(&self, interview_id: &str, role: &str, text: &str)
        -> Result<(), ClientError>;

    /// Asks the gateway to evaluate the interview and returns the raw feedback text.
    async fn generate_feedback(&self, interview_id: &str) -> Result<String, ClientError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SaveMessageBody<'a> {
    interview_id: &'a str,
    role: &'a str,
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateFeedbackBody<'a> {
    interview_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// `reqwest`-backed gateway client.
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl InterviewGateway for HttpGateway {
    async fn upload_resume(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, ClientError> {
        let part = multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = multipart::Form::new().part("resume", part);

        let response = self
            .client
            .post(self.url("/resume/upload"))
            .multipart(form)
            .send()
            .await?;

        let body: UploadResponse = ensure_success(response).await?.json().await?;
        debug!("Resume parsed ({} chars)", body.text.len());
        Ok(body.text)
    }

    async fn save_message(
        &self,
        interview_id: &str,
        role: &str,
        text: &str,
    ) -> Result<(), ClientError> {
        let response = self
            .client
            .post(self.url("/conversation/save"))
            .json(&SaveMessageBody {
                interview_id,
                role,
                text,
            })
            .send()
            .await?;

        ensure_success(response).await?;
        Ok(())
    }

    async fn generate_feedback(&self, interview_id: &str) -> Result<String, ClientError> {
        let response = self
            .client
            .post(self.url("/feedback/generate"))
            .json(&GenerateFeedbackBody { interview_id })
            .send()
            .await?;

        let body: Value = ensure_success(response).await?.json().await?;
        feedback_from_body(body)
    }
}

async fn ensure_success(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Api {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

/// Pulls `error.message` out of the gateway's error envelope, or returns the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}

/// Accepts `{"feedback": "..."}` or a bare JSON string.
fn feedback_from_body(body: Value) -> Result<String, ClientError> {
    match body {
        Value::Object(mut map) => match map.remove("feedback") {
            Some(Value::String(feedback)) => Ok(feedback),
            _ => Err(ClientError::UnexpectedResponse(Value::Object(map).to_string())),
        },
        Value::String(feedback) => Ok(feedback),
        other => Err(ClientError::UnexpectedResponse(other.to_string())),
    }
}
