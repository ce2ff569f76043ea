//! Generation backend port - the uniform capability all inference engines
//! implement.
//!
//! Every concrete backend (local model, hosted API, dedicated endpoint,
//! deterministic mock) satisfies the same contract, so they are
//! interchangeable without call-site changes. A backend holds no
//! per-request mutable state: one long-lived instance is shared across all
//! requests and concurrent `generate` calls must be safe to issue in
//! parallel.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::generation::GenerationParams;
use crate::domain::session::Turn;

/// Port for text-generation engines.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generates the next assistant turn for the given conversation.
    ///
    /// `turns` is the full ordered history including the system prompt.
    /// Implementations return only the newly generated text, never echoing
    /// the input prompt.
    async fn generate(
        &self,
        turns: &[Turn],
        params: &GenerationParams,
    ) -> Result<String, GenerationError>;

    /// Describes the backend (name, model, device).
    fn info(&self) -> BackendInfo;
}

/// Backend identity exposed through health reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendInfo {
    pub name: String,
    pub model: String,
    pub device: String,
}

impl BackendInfo {
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        device: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            device: device.into(),
        }
    }
}

/// Generation failure, classified by cause.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The model or service is not ready to serve (e.g. still loading).
    #[error("backend unavailable: {message}")]
    Unavailable {
        /// Error details from the backend.
        message: String,
    },

    /// Credential was rejected by the upstream service.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Upstream rate limit hit.
    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds until retry is allowed.
        retry_after_secs: u32,
    },

    /// The request exceeded its time bound.
    #[error("request timed out after {timeout_secs}s")]
    Timeout {
        /// Configured timeout.
        timeout_secs: u32,
    },

    /// Transport-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// Upstream responded but the payload was not understandable.
    #[error("malformed backend response: {0}")]
    Malformed(String),
}

impl GenerationError {
    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a rate limited error.
    pub fn rate_limited(retry_after_secs: u32) -> Self {
        Self::RateLimited { retry_after_secs }
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates a malformed response error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    /// Returns true if retrying the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GenerationError::Unavailable { .. }
                | GenerationError::RateLimited { .. }
                | GenerationError::Timeout { .. }
                | GenerationError::Network(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(GenerationError::unavailable("loading").is_retryable());
        assert!(GenerationError::rate_limited(30).is_retryable());
        assert!(GenerationError::network("reset").is_retryable());
        assert!(GenerationError::Timeout { timeout_secs: 60 }.is_retryable());

        assert!(!GenerationError::AuthenticationFailed.is_retryable());
        assert!(!GenerationError::malformed("bad json").is_retryable());
    }

    #[test]
    fn errors_display_their_cause() {
        assert_eq!(
            GenerationError::rate_limited(30).to_string(),
            "rate limited: retry after 30s"
        );
        assert_eq!(
            GenerationError::Timeout { timeout_secs: 60 }.to_string(),
            "request timed out after 60s"
        );
        assert!(GenerationError::unavailable("model loading")
            .to_string()
            .contains("model loading"));
    }

    #[test]
    fn backend_info_carries_identity() {
        let info = BackendInfo::new("mock", "mock-patient", "mock");
        assert_eq!(info.name, "mock");
        assert_eq!(info.model, "mock-patient");
    }
}
