//! Validated generation parameters for patient response sampling.
//!
//! All parameters are range-checked at construction. Out-of-range values
//! are rejected, never clamped, so a caller can rely on an accepted value
//! being exactly what it asked for.

use serde::{Deserialize, Serialize};

use super::foundation::ValidationError;

/// Inclusive bounds for each sampling parameter.
pub const MIN_NEW_TOKENS: u32 = 10;
pub const MAX_NEW_TOKENS: u32 = 500;
pub const MIN_TEMPERATURE: f32 = 0.0;
pub const MAX_TEMPERATURE: f32 = 1.5;
pub const MIN_TOP_P: f32 = 0.0;
pub const MAX_TOP_P: f32 = 1.0;
pub const MIN_REPETITION_PENALTY: f32 = 1.0;
pub const MAX_REPETITION_PENALTY: f32 = 2.0;

/// Sampling parameters for a single generation request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGenerationParams")]
pub struct GenerationParams {
    max_new_tokens: u32,
    temperature: f32,
    top_p: f32,
    repetition_penalty: f32,
}

impl GenerationParams {
    /// Creates validated parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::OutOfRange`] naming the first offending
    /// field. Values are never clamped into bounds.
    pub fn new(
        max_new_tokens: u32,
        temperature: f32,
        top_p: f32,
        repetition_penalty: f32,
    ) -> Result<Self, ValidationError> {
        if !(MIN_NEW_TOKENS..=MAX_NEW_TOKENS).contains(&max_new_tokens) {
            return Err(ValidationError::out_of_range(
                "max_new_tokens",
                MIN_NEW_TOKENS as f64,
                MAX_NEW_TOKENS as f64,
                max_new_tokens as f64,
            ));
        }
        if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&temperature) {
            return Err(ValidationError::out_of_range(
                "temperature",
                MIN_TEMPERATURE as f64,
                MAX_TEMPERATURE as f64,
                temperature as f64,
            ));
        }
        if !(MIN_TOP_P..=MAX_TOP_P).contains(&top_p) {
            return Err(ValidationError::out_of_range(
                "top_p",
                MIN_TOP_P as f64,
                MAX_TOP_P as f64,
                top_p as f64,
            ));
        }
        if !(MIN_REPETITION_PENALTY..=MAX_REPETITION_PENALTY).contains(&repetition_penalty) {
            return Err(ValidationError::out_of_range(
                "repetition_penalty",
                MIN_REPETITION_PENALTY as f64,
                MAX_REPETITION_PENALTY as f64,
                repetition_penalty as f64,
            ));
        }

        Ok(Self {
            max_new_tokens,
            temperature,
            top_p,
            repetition_penalty,
        })
    }

    /// Low creativity, high consistency. The default for clinical use.
    pub fn conservative() -> Self {
        Self {
            max_new_tokens: 80,
            temperature: 0.3,
            top_p: 0.85,
            repetition_penalty: 1.15,
        }
    }

    /// Moderate creativity with safe bounds.
    pub fn balanced() -> Self {
        Self {
            max_new_tokens: 100,
            temperature: 0.4,
            top_p: 0.9,
            repetition_penalty: 1.1,
        }
    }

    /// Higher variability, intended for exploratory testing.
    pub fn creative() -> Self {
        Self {
            max_new_tokens: 150,
            temperature: 0.7,
            top_p: 0.95,
            repetition_penalty: 1.05,
        }
    }

    pub fn max_new_tokens(&self) -> u32 {
        self.max_new_tokens
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn top_p(&self) -> f32 {
        self.top_p
    }

    pub fn repetition_penalty(&self) -> f32 {
        self.repetition_penalty
    }
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self::conservative()
    }
}

/// Unvalidated wire shape, used so deserialization goes through `new`.
#[derive(Debug, Deserialize)]
struct RawGenerationParams {
    max_new_tokens: u32,
    temperature: f32,
    top_p: f32,
    repetition_penalty: f32,
}

impl TryFrom<RawGenerationParams> for GenerationParams {
    type Error = ValidationError;

    fn try_from(raw: RawGenerationParams) -> Result<Self, Self::Error> {
        GenerationParams::new(
            raw.max_new_tokens,
            raw.temperature,
            raw.top_p,
            raw.repetition_penalty,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_in_range_values() {
        let params = GenerationParams::new(100, 0.4, 0.9, 1.1).unwrap();
        assert_eq!(params.max_new_tokens(), 100);
        assert_eq!(params.temperature(), 0.4);
        assert_eq!(params.top_p(), 0.9);
        assert_eq!(params.repetition_penalty(), 1.1);
    }

    #[test]
    fn accepts_boundary_values() {
        assert!(GenerationParams::new(MIN_NEW_TOKENS, MIN_TEMPERATURE, MIN_TOP_P, MIN_REPETITION_PENALTY).is_ok());
        assert!(GenerationParams::new(MAX_NEW_TOKENS, MAX_TEMPERATURE, MAX_TOP_P, MAX_REPETITION_PENALTY).is_ok());
    }

    #[test]
    fn rejects_out_of_range_tokens() {
        let err = GenerationParams::new(9, 0.4, 0.9, 1.1).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { field: "max_new_tokens", .. }));
        assert!(GenerationParams::new(501, 0.4, 0.9, 1.1).is_err());
    }

    #[test]
    fn rejects_out_of_range_temperature() {
        assert!(GenerationParams::new(100, -0.1, 0.9, 1.1).is_err());
        assert!(GenerationParams::new(100, 1.6, 0.9, 1.1).is_err());
    }

    #[test]
    fn rejects_out_of_range_top_p() {
        assert!(GenerationParams::new(100, 0.4, 1.01, 1.1).is_err());
    }

    #[test]
    fn rejects_out_of_range_repetition_penalty() {
        assert!(GenerationParams::new(100, 0.4, 0.9, 0.99).is_err());
        assert!(GenerationParams::new(100, 0.4, 0.9, 2.1).is_err());
    }

    #[test]
    fn default_is_conservative_preset() {
        assert_eq!(GenerationParams::default(), GenerationParams::conservative());
    }

    #[test]
    fn presets_are_valid() {
        for preset in [
            GenerationParams::conservative(),
            GenerationParams::balanced(),
            GenerationParams::creative(),
        ] {
            assert!(GenerationParams::new(
                preset.max_new_tokens(),
                preset.temperature(),
                preset.top_p(),
                preset.repetition_penalty(),
            )
            .is_ok());
        }
    }

    #[test]
    fn deserialization_validates_ranges() {
        let ok: Result<GenerationParams, _> = serde_json::from_str(
            r#"{"max_new_tokens":100,"temperature":0.4,"top_p":0.9,"repetition_penalty":1.1}"#,
        );
        assert!(ok.is_ok());

        let err: Result<GenerationParams, _> = serde_json::from_str(
            r#"{"max_new_tokens":1000,"temperature":0.4,"top_p":0.9,"repetition_penalty":1.1}"#,
        );
        assert!(err.is_err());
    }
}
