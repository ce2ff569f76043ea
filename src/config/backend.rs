//! Generation backend configuration.

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use super::error::ValidationError;

/// Which generation backend to construct at startup.
///
/// Whatever is configured here is preferred; if its construction fails the
/// engine degrades to the mock backend rather than starting uninitialized.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Hosted text-generation API (shared inference service).
    HostedApi,
    /// Dedicated inference endpoint with a caller-configured URL.
    Endpoint,
    /// In-process model runner (requires the `local-model` feature).
    Local,
    /// Deterministic mock; needs no credentials.
    #[default]
    Mock,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::HostedApi => "hosted_api",
            BackendKind::Endpoint => "endpoint",
            BackendKind::Local => "local",
            BackendKind::Mock => "mock",
        }
    }
}

/// Generation backend configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Backend to construct at startup.
    #[serde(default)]
    pub kind: BackendKind,

    /// Access token for remote backends.
    pub api_token: Option<Secret<String>>,

    /// Model identifier on the hosted inference service.
    #[serde(default = "default_model_id")]
    pub model_id: String,

    /// Base URL of the hosted inference service.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Dedicated endpoint URL (required for `kind = endpoint`).
    pub endpoint_url: Option<String>,

    /// Directory holding `model.onnx` and `tokenizer.json` for the local
    /// backend.
    pub model_dir: Option<PathBuf>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries on transient failures.
    #[serde(default = "default_retries")]
    pub max_retries: u32,
}

impl BackendConfig {
    /// Get timeout as Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check if an access token is configured and non-empty.
    pub fn has_token(&self) -> bool {
        self.api_token
            .as_ref()
            .is_some_and(|t| !t.expose_secret().is_empty())
    }

    /// Exposes the configured token, if any.
    pub fn token(&self) -> Option<&str> {
        self.api_token.as_ref().map(|t| t.expose_secret().as_str())
    }

    /// Validate backend configuration.
    ///
    /// Missing credentials are not an error here: the selection chain
    /// degrades to the mock backend and reports the degradation. Only
    /// values that can never work are rejected.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.timeout_secs == 0 {
            return Err(ValidationError::invalid_value(
                "backend.timeout_secs",
                "must be greater than zero",
            ));
        }
        if self.base_url.is_empty() {
            return Err(ValidationError::invalid_value(
                "backend.base_url",
                "must not be empty",
            ));
        }
        if let Some(url) = &self.endpoint_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ValidationError::invalid_value(
                    "backend.endpoint_url",
                    "must be an http(s) URL",
                ));
            }
        }
        Ok(())
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            api_token: None,
            model_id: default_model_id(),
            base_url: default_base_url(),
            endpoint_url: None,
            model_dir: None,
            timeout_secs: default_timeout(),
            max_retries: default_retries(),
        }
    }
}

fn default_model_id() -> String {
    "microsoft/Phi-3.5-mini-instruct".to_string()
}

fn default_base_url() -> String {
    "https://api-inference.huggingface.co".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_retries() -> u32 {
    3
}
