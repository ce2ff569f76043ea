//! Wire types shared by the hosted-API and dedicated-endpoint backends.
//!
//! Both speak the same text-generation protocol by design: a flattened
//! prompt in, a `generated_text` continuation out, with identical status
//! semantics.

use serde::Serialize;

use crate::domain::generation::GenerationParams;
use crate::ports::GenerationError;

/// Request payload for a text-generation call.
#[derive(Debug, Serialize)]
pub(crate) struct InferenceRequest<'a> {
    pub inputs: &'a str,
    pub parameters: InferenceParameters,
}

/// Sampling parameters on the wire.
#[derive(Debug, Serialize)]
pub(crate) struct InferenceParameters {
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub repetition_penalty: f32,
    /// Ask the service for only the continuation, never the echoed prompt.
    pub return_full_text: bool,
}

impl From<&GenerationParams> for InferenceParameters {
    fn from(params: &GenerationParams) -> Self {
        Self {
            max_new_tokens: params.max_new_tokens(),
            temperature: params.temperature(),
            top_p: params.top_p(),
            repetition_penalty: params.repetition_penalty(),
            return_full_text: false,
        }
    }
}

/// Maps a non-success HTTP status into the failure taxonomy.
pub(crate) fn classify_status(status: u16, body: &str) -> GenerationError {
    match status {
        503 => GenerationError::unavailable(format!("model is loading: {}", body)),
        401 => GenerationError::AuthenticationFailed,
        429 => GenerationError::rate_limited(60),
        500..=599 => GenerationError::unavailable(format!("server error {}: {}", status, body)),
        _ => GenerationError::network(format!("unexpected status {}: {}", status, body)),
    }
}

/// Extracts the generated continuation from a response body.
///
/// Services return either a list (`[{"generated_text": …}]`) or a bare
/// object (`{"generated_text": …}`); anything else is malformed.
pub(crate) fn extract_generated_text(body: &str) -> Result<String, GenerationError> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| GenerationError::malformed(format!("invalid JSON: {}", e)))?;

    let text = match &value {
        serde_json::Value::Array(items) => items
            .first()
            .and_then(|item| item.get("generated_text"))
            .and_then(|t| t.as_str()),
        serde_json::Value::Object(_) => value.get("generated_text").and_then(|t| t.as_str()),
        _ => None,
    };

    match text {
        Some(text) => Ok(text.trim().to_string()),
        None => Err(GenerationError::malformed(format!(
            "no generated_text in response: {}",
            body
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameters_mirror_generation_params() {
        let params = GenerationParams::balanced();
        let wire = InferenceParameters::from(&params);

        assert_eq!(wire.max_new_tokens, 100);
        assert_eq!(wire.temperature, 0.4);
        assert!(!wire.return_full_text);
    }

    #[test]
    fn classify_status_maps_the_failure_taxonomy() {
        assert!(matches!(
            classify_status(503, "loading"),
            GenerationError::Unavailable { .. }
        ));
        assert!(matches!(
            classify_status(401, ""),
            GenerationError::AuthenticationFailed
        ));
        assert!(matches!(
            classify_status(429, ""),
            GenerationError::RateLimited { .. }
        ));
        assert!(matches!(
            classify_status(500, "boom"),
            GenerationError::Unavailable { .. }
        ));
        assert!(matches!(
            classify_status(418, ""),
            GenerationError::Network(_)
        ));
    }

    #[test]
    fn extract_handles_list_response() {
        let text =
            extract_generated_text(r#"[{"generated_text": " My tooth hurts. "}]"#).unwrap();
        assert_eq!(text, "My tooth hurts.");
    }

    #[test]
    fn extract_handles_object_response() {
        let text = extract_generated_text(r#"{"generated_text": "It aches."}"#).unwrap();
        assert_eq!(text, "It aches.");
    }

    #[test]
    fn extract_rejects_other_shapes() {
        assert!(matches!(
            extract_generated_text(r#""just a string""#),
            Err(GenerationError::Malformed(_))
        ));
        assert!(matches!(
            extract_generated_text(r#"{"unexpected": 1}"#),
            Err(GenerationError::Malformed(_))
        ));
        assert!(matches!(
            extract_generated_text("not json"),
            Err(GenerationError::Malformed(_))
        ));
    }
}
