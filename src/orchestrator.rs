//! Two-phase orchestration: ingest, then ask
//!
//! Each run is self-contained and re-ingests before asking, so the answer
//! is always produced against the requested repository. Ingestion failure
//! short-circuits: the corpus state for `/ask` would be undefined, and a
//! clear failure beats a misleading answer.

use crate::backend::{ApiError, AskReply, BackendClient};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Which part of a run produced a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Ingest,
    Ask,
    /// Failures not attributable to either remote call
    Transport,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Ingest => write!(f, "ingest"),
            Phase::Ask => write!(f, "ask"),
            Phase::Transport => write!(f, "transport"),
        }
    }
}

/// Terminal failure for one orchestration run
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct OrchestrationError {
    pub phase: Phase,
    pub message: String,
}

impl OrchestrationError {
    fn ingest(err: ApiError) -> Self {
        Self {
            phase: Phase::Ingest,
            message: err.message,
        }
    }

    fn ask(err: ApiError) -> Self {
        Self {
            phase: Phase::Ask,
            message: err.message,
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            phase: Phase::Transport,
            message: message.into(),
        }
    }

    fn malformed_answer() -> Self {
        Self {
            phase: Phase::Ask,
            message: "malformed answer: missing explanation, fileName, or codeSnippet"
                .to_string(),
        }
    }
}

/// The complete success payload; never partially populated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub explanation: String,
    pub file_name: String,
    pub code_snippet: String,
}

/// Run one ingest-then-ask sequence against the backend.
pub async fn run(
    backend: &dyn BackendClient,
    repo_url: &str,
    question: &str,
) -> Result<Answer, OrchestrationError> {
    backend
        .ingest(repo_url)
        .await
        .map_err(OrchestrationError::ingest)?;

    let reply = backend
        .ask(question)
        .await
        .map_err(OrchestrationError::ask)?;

    complete_answer(reply).ok_or_else(OrchestrationError::malformed_answer)
}

/// A reply with any field absent is a malformed response, not a partial
/// success. Empty strings are present and pass through.
fn complete_answer(reply: AskReply) -> Option<Answer> {
    Some(Answer {
        explanation: reply.explanation?,
        file_name: reply.file_name?,
        code_snippet: reply.code_snippet?,
    })
}
