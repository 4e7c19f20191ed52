//! Environment configuration for the client

use std::time::Duration;

/// The backend's default listen address (Flask's dev default).
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";

/// Ingestion clones and indexes a whole repository; generous by default.
const DEFAULT_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the Q&A backend.
    pub backend_url: String,
    /// Per-request timeout applied by the HTTP client.
    pub timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        let backend_url = std::env::var("CODEQA_BACKEND_URL")
            .unwrap_or_else(|_| DEFAULT_BACKEND_URL.to_string());

        let timeout_secs = std::env::var("CODEQA_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            backend_url,
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}
