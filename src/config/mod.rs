//! Engine configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Values are read with the `PATIENT_SIM`
//! prefix and nested values use double underscores as separators, e.g.
//! `PATIENT_SIM__BACKEND__KIND=hosted_api`.

mod backend;
mod error;

pub use backend::{BackendConfig, BackendKind};
pub use error::{ConfigError, ValidationError};

use serde::Deserialize;

/// Root engine configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    /// Generation backend selection and credentials.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Session lifecycle settings.
    #[serde(default)]
    pub session: SessionConfig,
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Loads a `.env` file if present (development), then reads variables
    /// with the `PATIENT_SIM` prefix, `__` separating nested values.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("PATIENT_SIM")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.backend.validate()?;
        self.session.validate()?;
        Ok(())
    }
}

/// Session lifecycle settings.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SessionConfig {
    /// Hours of inactivity after which a session is removed by the expiry
    /// sweep.
    #[serde(default = "default_expiry_hours")]
    pub expiry_hours: i64,

    /// Turn count past which callers are signaled to reset. Advisory only.
    #[serde(default = "default_turn_ceiling")]
    pub turn_ceiling: usize,
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.expiry_hours <= 0 {
            return Err(ValidationError::invalid_value(
                "session.expiry_hours",
                "must be positive",
            ));
        }
        if self.turn_ceiling == 0 {
            return Err(ValidationError::invalid_value(
                "session.turn_ceiling",
                "must be positive",
            ));
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            expiry_hours: default_expiry_hours(),
            turn_ceiling: default_turn_ceiling(),
        }
    }
}

fn default_expiry_hours() -> i64 {
    24
}

fn default_turn_ceiling() -> usize {
    100
}
