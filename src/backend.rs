//! Remote backend client
//!
//! Speaks JSON over HTTP to the two backend operations (`/ingest` and
//! `/ask`). Tests substitute queue-backed mocks through the
//! `BackendClient` trait.

use crate::config::Config;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;

/// Backend error with classification
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Network, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Malformed, message)
    }
}

/// Error classification for a future retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// No response at all (connect failure, timeout) - plausibly transient
    Network,
    /// Server error (5xx) - plausibly transient
    Server,
    /// Application rejection (4xx) - not transient
    Rejected,
    /// Success status but the body did not parse
    Malformed,
}

impl ApiErrorKind {
    #[allow(dead_code)] // Classification consumed by a future retry policy
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::Server)
    }
}

/// Interface to the two remote operations. No retries at this layer;
/// retry policy, if any, belongs to the caller.
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// `POST /ingest` - clone and index the repository. Idempotent and
    /// slow on the remote side; any 2xx is success and the body is ignored.
    async fn ingest(&self, repo_url: &str) -> Result<(), ApiError>;

    /// `POST /ask` - answer a question against the ingested corpus.
    async fn ask(&self, question: &str) -> Result<AskReply, ApiError>;
}

/// Raw `/ask` reply. Fields are optional at the wire level; presence is
/// the orchestrator's concern, not the transport's.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AskReply {
    pub explanation: Option<String>,
    #[serde(rename = "fileName")]
    pub file_name: Option<String>,
    #[serde(rename = "codeSnippet")]
    pub code_snippet: Option<String>,
}

#[derive(Debug, Serialize)]
struct IngestRequest<'a> {
    repo_url: &'a str,
}

#[derive(Debug, Serialize)]
struct AskRequest<'a> {
    question: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP implementation of `BackendClient`
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.backend_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post_json<T: Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<(StatusCode, String), ApiError> {
        let url = format!("{}{path}", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ApiError::network(format!("request timeout: {e}"))
                } else if e.is_connect() {
                    ApiError::network(format!("connection failed: {e}"))
                } else {
                    ApiError::network(format!("request failed: {e}"))
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::network(format!("failed to read response: {e}")))?;

        Ok((status, text))
    }
}

#[async_trait]
impl BackendClient for HttpBackend {
    async fn ingest(&self, repo_url: &str) -> Result<(), ApiError> {
        let start = Instant::now();
        let (status, body) = self.post_json("/ingest", &IngestRequest { repo_url }).await?;

        if !status.is_success() {
            let err = status_error(status, &body, "ingestion failed");
            tracing::warn!(status = status.as_u16(), error = %err.message, "ingest rejected");
            return Err(err);
        }

        tracing::info!(
            duration_ms = %start.elapsed().as_millis(),
            "repository ingested"
        );
        Ok(())
    }

    async fn ask(&self, question: &str) -> Result<AskReply, ApiError> {
        let start = Instant::now();
        let (status, body) = self.post_json("/ask", &AskRequest { question }).await?;

        if !status.is_success() {
            let err = status_error(status, &body, "request failed");
            tracing::warn!(status = status.as_u16(), error = %err.message, "ask rejected");
            return Err(err);
        }

        let reply = serde_json::from_str::<AskReply>(&body)
            .map_err(|e| ApiError::malformed(format!("failed to parse answer: {e}")))?;

        tracing::info!(
            duration_ms = %start.elapsed().as_millis(),
            "question answered"
        );
        Ok(reply)
    }
}

/// Map a non-success status to the error classification
fn classify_status(status: StatusCode) -> ApiErrorKind {
    if status.is_server_error() {
        ApiErrorKind::Server
    } else {
        ApiErrorKind::Rejected
    }
}

/// Surface a structured `{ "error": ... }` body verbatim; otherwise
/// synthesize a message embedding the status code. Either way the caller
/// sees the same failure shape.
fn status_error(status: StatusCode, body: &str, fallback: &str) -> ApiError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| format!("{fallback} with status {}", status.as_u16()));
    ApiError::new(classify_status(status), message)
}
