//! Submission validation
//!
//! Rejects incomplete submissions before any network activity happens,
//! so an obviously empty form never triggers an ingestion.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("repository URL must not be empty")]
    EmptyRepoUrl,
    #[error("question must not be empty")]
    EmptyQuestion,
}

/// Check both inputs for non-emptiness. Deeper repository-URL validation
/// is the backend's responsibility.
pub fn validate(repo_url: &str, question: &str) -> Result<(), ValidationError> {
    if repo_url.trim().is_empty() {
        return Err(ValidationError::EmptyRepoUrl);
    }
    if question.trim().is_empty() {
        return Err(ValidationError::EmptyQuestion);
    }
    Ok(())
}
