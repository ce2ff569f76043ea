//! Engine-level error taxonomy.

use thiserror::Error;

use crate::domain::foundation::{ChatId, ValidationError};
use crate::ports::GenerationError;

/// Errors surfaced to callers of the engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Unknown session id. Recoverable by the caller; never retried
    /// internally.
    #[error("chat session not found: {0}")]
    ChatNotFound(ChatId),

    /// Unknown pathology key, rejected before any state mutation.
    #[error("unknown pathology '{requested}'")]
    UnknownPathology {
        requested: String,
        valid: Vec<&'static str>,
    },

    /// Caller-supplied generation parameters failed range validation.
    /// Rejected before any state mutation, never clamped.
    #[error("invalid generation parameters: {0}")]
    InvalidParams(#[from] ValidationError),

    /// No generation backend is initialized yet.
    #[error("generation backend not available")]
    BackendUnavailable,

    /// The backend call failed. The triggering user turn has been rolled
    /// back so retries see a clean history.
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),
}

impl EngineError {
    pub fn unknown_pathology(requested: impl Into<String>, valid: Vec<&'static str>) -> Self {
        Self::UnknownPathology {
            requested: requested.into(),
            valid,
        }
    }

    /// Stable machine-readable code for the external routing layer.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::ChatNotFound(_) => "CHAT_NOT_FOUND",
            EngineError::UnknownPathology { .. } => "INVALID_PATHOLOGY",
            EngineError::InvalidParams(_) => "INVALID_PARAMETERS",
            EngineError::BackendUnavailable => "BACKEND_UNAVAILABLE",
            EngineError::Generation(err) => match err {
                GenerationError::AuthenticationFailed => "AUTHENTICATION_FAILED",
                GenerationError::RateLimited { .. } => "RATE_LIMITED",
                _ => "GENERATION_FAILED",
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_distinguish_the_taxonomy() {
        assert_eq!(EngineError::ChatNotFound(ChatId::new()).code(), "CHAT_NOT_FOUND");
        assert_eq!(
            EngineError::unknown_pathology("bogus", vec![]).code(),
            "INVALID_PATHOLOGY"
        );
        assert_eq!(EngineError::BackendUnavailable.code(), "BACKEND_UNAVAILABLE");
        assert_eq!(
            EngineError::Generation(GenerationError::AuthenticationFailed).code(),
            "AUTHENTICATION_FAILED"
        );
        assert_eq!(
            EngineError::Generation(GenerationError::rate_limited(5)).code(),
            "RATE_LIMITED"
        );
        assert_eq!(
            EngineError::Generation(GenerationError::network("x")).code(),
            "GENERATION_FAILED"
        );
    }

    #[test]
    fn validation_error_converts_to_invalid_params() {
        let err: EngineError = ValidationError::out_of_range("temperature", 0.0, 1.5, 9.0).into();
        assert_eq!(err.code(), "INVALID_PARAMETERS");
    }
}
