//! Dedicated inference endpoint backend.
//!
//! Same contract and wire protocol as the hosted-API backend, but targets
//! a caller-configured endpoint URL where the fine-tuned model is deployed
//! on reserved hardware.

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

/// Configuration for the dedicated-endpoint backend.
#[derive(Debug, Clone)]
pub struct InferenceEndpointConfig {
    /// Full URL of the deployed endpoint.
    pub endpoint_url: String,
    /// Access token for the endpoint.
    api_token: Secret<String>,
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum retries on transient failures.
    pub max_retries: u32,
}

impl InferenceEndpointConfig {
    pub fn new(endpoint_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            api_token: Secret::new(api_token.into()),
            timeout: Duration::from_secs(60),
            max_retries: 3,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn api_token(&self) -> &str {
        self.api_token.expose_secret()
    }
}

/// Backend for a dedicated inference endpoint.
pub struct InferenceEndpointBackend {
    config: InferenceEndpointConfig,
    client: Client,
}

impl InferenceEndpointBackend {
    /// Creates the backend, failing fast when URL or token is absent.
    pub fn new(config: InferenceEndpointConfig) -> Result<Self, BackendBuildError> {
        if config.endpoint_url.is_empty() {
            return Err(BackendBuildError::MissingEndpointUrl);
        }
        if config.api_token().is_empty() {
            return Err(BackendBuildError::MissingCredential("api token"));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BackendBuildError::HttpClient(e.to_string()))?;

        Ok(Self { config, client })
    }

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
            .post(&self.config.endpoint_url)
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
impl GenerationBackend for InferenceEndpointBackend {
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
                        "endpoint call failed, retrying"
                    );
                    sleep(Duration::from_secs(1 << retry_count)).await;
                    retry_count += 1;
                }
            }
        }
    }

    fn info(&self) -> BackendInfo {
        BackendInfo::new("inference-endpoint", &self.config.endpoint_url, "remote")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_fails_fast_without_url() {
        let result = InferenceEndpointBackend::new(InferenceEndpointConfig::new("", "token"));
        assert!(matches!(result, Err(BackendBuildError::MissingEndpointUrl)));
    }

    #[test]
    fn construction_fails_fast_without_token() {
        let result = InferenceEndpointBackend::new(InferenceEndpointConfig::new(
            "https://xxx.endpoints.example.cloud",
            "",
        ));
        assert!(matches!(
            result,
            Err(BackendBuildError::MissingCredential(_))
        ));
    }

    #[test]
    fn info_names_the_endpoint() {
        let backend = InferenceEndpointBackend::new(InferenceEndpointConfig::new(
            "https://xxx.endpoints.example.cloud",
            "token",
        ))
        .unwrap();

        let info = backend.info();
        assert_eq!(info.name, "inference-endpoint");
        assert_eq!(info.model, "https://xxx.endpoints.example.cloud");
    }
}
