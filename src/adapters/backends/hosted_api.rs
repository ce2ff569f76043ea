//! Hosted inference API backend.
//!
//! Serializes the conversation into a single flattened prompt and posts it
//! to a shared hosted text-generation service. No local model loading
//! required - all inference happens in the cloud.
//!
//! # Configuration
//!
//! ```ignore
//! let config = HostedApiConfig::new(api_token)
//!     .with_model("microsoft/Phi-3.5-mini-instruct")
//!     .with_base_url("https://api-inference.huggingface.co");
//!
//! let backend = HostedApiBackend::new(config)?;
//! ```

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use std::time::Duration;
use tokio::time::sleep;

use crate::domain::generation::GenerationParams;
use crate::domain::session::Turn;
use crate::ports::{BackendInfo, GenerationBackend, GenerationError};

use super::wire::{classify_status, extract_generated_text, InferenceRequest};
use super::{flatten_prompt, BackendBuildError};

/// Configuration for the hosted-API backend.
#[derive(Debug, Clone)]
pub struct HostedApiConfig {
    /// Access token for the inference service.
    api_token: Secret<String>,
    /// Model identifier (e.g. "microsoft/Phi-3.5-mini-instruct").
    pub model_id: String,
    /// Base URL of the service.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum retries on transient failures.
    pub max_retries: u32,
}

impl HostedApiConfig {
    /// Creates a new configuration with the given access token.
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: Secret::new(api_token.into()),
            model_id: "microsoft/Phi-3.5-mini-instruct".to_string(),
            base_url: "https://api-inference.huggingface.co".to_string(),
            timeout: Duration::from_secs(60),
            max_retries: 3,
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the maximum retry count.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn api_token(&self) -> &str {
        self.api_token.expose_secret()
    }
}

/// Hosted text-generation API backend.
pub struct HostedApiBackend {
    config: HostedApiConfig,
    client: Client,
}

impl HostedApiBackend {
    /// Creates the backend, failing fast when the access token is absent.
    pub fn new(config: HostedApiConfig) -> Result<Self, BackendBuildError> {
        if config.api_token().is_empty() {
            return Err(BackendBuildError::MissingCredential("api token"));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BackendBuildError::HttpClient(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn generation_url(&self) -> String {
        format!("{}/models/{}", self.config.base_url, self.config.model_id)
    }

    /// One request/response cycle, without retries.
    async fn generate_once(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, GenerationError> {
        let payload = InferenceRequest {
            inputs: prompt,
            parameters: params.into(),
        };

        let response = self
            .client
            .post(self.generation_url())
            .bearer_auth(self.config.api_token())
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout {
                        timeout_secs: self.config.timeout.as_secs() as u32,
                    }
                } else if e.is_connect() {
                    GenerationError::network(format!("connection failed: {}", e))
                } else {
                    GenerationError::network(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::network(e.to_string()))?;

        if !status.is_success() {
            return Err(classify_status(status.as_u16(), &body));
        }

        extract_generated_text(&body)
    }
}

#[async_trait]
impl GenerationBackend for HostedApiBackend {
    async fn generate(
        &self,
        turns: &[Turn],
        params: &GenerationParams,
    ) -> Result<String, GenerationError> {
        let prompt = flatten_prompt(turns);
        let mut retry_count = 0;

        loop {
            match self.generate_once(&prompt, params).await {
                Ok(text) => return Ok(text),
                Err(err) => {
                    if !err.is_retryable() || retry_count >= self.config.max_retries {
                        return Err(err);
                    }
                    tracing::debug!(
                        error = %err,
                        retry = retry_count + 1,
                        "hosted API call failed, retrying"
                    );
                    // Exponential backoff: 1s, 2s, 4s, ...
                    sleep(Duration::from_secs(1 << retry_count)).await;
                    retry_count += 1;
                }
            }
        }
    }

    fn info(&self) -> BackendInfo {
        BackendInfo::new("hosted-api", &self.config.model_id, "remote")
    }
}
