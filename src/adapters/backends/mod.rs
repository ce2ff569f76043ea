//! Generation backend adapters.
//!
//! Implementations of the GenerationBackend port:
//!
//! - `MockPatientBackend` - deterministic canned replies, needs no model
//! - `HostedApiBackend` - shared hosted text-generation API
//! - `InferenceEndpointBackend` - dedicated caller-configured endpoint
//! - `LocalModelBackend` - in-process ONNX runner (`local-model` feature)
//!
//! `selection` composes whichever backend the configuration asks for,
//! degrading to the mock when construction fails.

mod endpoint;
mod hosted_api;
#[cfg(feature = "local-model")]
mod local;
mod mock;
mod selection;
mod wire;

pub use endpoint::{InferenceEndpointBackend, InferenceEndpointConfig};
pub use hosted_api::{HostedApiBackend, HostedApiConfig};
#[cfg(feature = "local-model")]
pub use local::{LocalModelBackend, LocalModelConfig};
pub use mock::MockPatientBackend;
pub use selection::{select_backend, Degradation, SelectedBackend};

use thiserror::Error;

use crate::domain::session::{Turn, TurnRole};

/// Errors constructing a backend at startup.
///
/// Construction failure is not fatal: the selection chain degrades to the
/// mock backend and records the reason.
#[derive(Debug, Error)]
pub enum BackendBuildError {
    #[error("missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("missing endpoint URL")]
    MissingEndpointUrl,

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("backend '{0}' requires a feature that is not compiled in")]
    FeatureDisabled(&'static str),

    #[error("failed to load local model: {0}")]
    ModelLoad(String),
}

/// Flattens a turn sequence into the role-tagged prompt format the
/// text-generation services expect, with a trailing generation cue.
pub(crate) fn flatten_prompt(turns: &[Turn]) -> String {
    let mut parts = Vec::with_capacity(turns.len() + 1);
    for turn in turns {
        let tag = match turn.role {
            TurnRole::System => "System",
            TurnRole::User => "User",
            TurnRole::Assistant => "Assistant",
        };
        parts.push(format!("{}: {}", tag, turn.text));
    }
    parts.push("Assistant:".to_string());
    parts.join("\n")
}
