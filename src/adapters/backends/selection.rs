//! Backend selection at the composition boundary.
//!
//! The configured backend is preferred; when its construction fails the
//! engine degrades to the mock backend instead of starting uninitialized.
//! Degradation is a first-class, inspectable value surfaced through the
//! engine's health report, never a silently swallowed exception.

use std::sync::Arc;

use crate::config::{BackendConfig, BackendKind};
use crate::ports::GenerationBackend;

use super::{
    BackendBuildError, HostedApiBackend, HostedApiConfig, InferenceEndpointBackend,
    InferenceEndpointConfig, MockPatientBackend,
};

/// Record of a fall-back from the configured backend to the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Degradation {
    /// The backend the configuration asked for.
    pub requested: BackendKind,
    /// Why its construction failed.
    pub reason: String,
}

/// Outcome of backend selection: the live backend plus an optional
/// degradation record.
pub struct SelectedBackend {
    pub backend: Arc<dyn GenerationBackend>,
    pub degradation: Option<Degradation>,
}

impl SelectedBackend {
    /// True when the configured backend was constructed as asked.
    pub fn is_degraded(&self) -> bool {
        self.degradation.is_some()
    }
}

/// Constructs the configured backend, degrading to the mock on failure.
pub fn select_backend(config: &BackendConfig) -> SelectedBackend {
    match build_configured(config) {
        Ok(backend) => SelectedBackend {
            backend,
            degradation: None,
        },
        Err(err) => {
            tracing::warn!(
                requested = config.kind.as_str(),
                error = %err,
                "backend construction failed; degrading to mock backend"
            );
            SelectedBackend {
                backend: Arc::new(MockPatientBackend::new()),
                degradation: Some(Degradation {
                    requested: config.kind,
                    reason: err.to_string(),
                }),
            }
        }
    }
}

fn build_configured(
    config: &BackendConfig,
) -> Result<Arc<dyn GenerationBackend>, BackendBuildError> {
    match config.kind {
        BackendKind::Mock => Ok(Arc::new(MockPatientBackend::new())),

        BackendKind::HostedApi => {
            let token = config
                .token()
                .ok_or(BackendBuildError::MissingCredential("api token"))?;
            let backend = HostedApiBackend::new(
                HostedApiConfig::new(token)
                    .with_model(&config.model_id)
                    .with_base_url(&config.base_url)
                    .with_timeout(config.timeout())
                    .with_max_retries(config.max_retries),
            )?;
            Ok(Arc::new(backend))
        }

        BackendKind::Endpoint => {
            let url = config
                .endpoint_url
                .as_deref()
                .ok_or(BackendBuildError::MissingEndpointUrl)?;
            let token = config
                .token()
                .ok_or(BackendBuildError::MissingCredential("api token"))?;
            let backend = InferenceEndpointBackend::new(
                InferenceEndpointConfig::new(url, token)
                    .with_timeout(config.timeout())
                    .with_max_retries(config.max_retries),
            )?;
            Ok(Arc::new(backend))
        }

        #[cfg(feature = "local-model")]
        BackendKind::Local => {
            let model_dir = config.model_dir.clone().ok_or_else(|| {
                BackendBuildError::ModelLoad("no model directory configured".to_string())
            })?;
            let backend =
                super::LocalModelBackend::load(&super::LocalModelConfig::new(model_dir))?;
            Ok(Arc::new(backend))
        }

        #[cfg(not(feature = "local-model"))]
        BackendKind::Local => Err(BackendBuildError::FeatureDisabled("local-model")),
    }
}
