//! Local ONNX inference backend - behind the `local-model` feature.
//!
//! Runs the merged model (base weights plus fine-tuned adapter, exported
//! ahead of time to ONNX) entirely in-process. The model directory must
//! contain:
//!
//! - `model.onnx` - the merged causal-LM weights
//! - `tokenizer.json` - HuggingFace tokenizer definition
//!
//! Generation builds the same role-tagged prompt as the remote backends
//! and runs a sampling loop (temperature, top-p, repetition penalty, eos
//! stop), returning only the newly generated suffix.
//!
//! Uses interior mutability (Mutex) because `ort::Session::run` requires
//! `&mut self` while the GenerationBackend trait exposes `&self` for
//! shared usage across concurrent requests.

use async_trait::async_trait;
use ort::session::Session;
use rand::Rng;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::domain::generation::GenerationParams;
use crate::domain::session::Turn;
use crate::ports::{BackendInfo, GenerationBackend, GenerationError};

use super::{flatten_prompt, BackendBuildError};

/// Configuration for the local model runner.
#[derive(Debug, Clone)]
pub struct LocalModelConfig {
    /// Directory holding `model.onnx` and `tokenizer.json`.
    pub model_dir: PathBuf,
    /// Tokens that terminate generation.
    pub eos_tokens: Vec<String>,
    /// Intra-op thread count for the ONNX session.
    pub intra_threads: usize,
}

impl LocalModelConfig {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            eos_tokens: vec![
                "<|end|>".to_string(),
                "<|endoftext|>".to_string(),
                "</s>".to_string(),
            ],
            intra_threads: 2,
        }
    }
}

/// In-process generation backend over an ONNX causal LM.
pub struct LocalModelBackend {
    session: Mutex<Session>,
    tokenizer: tokenizers::Tokenizer,
    eos_ids: HashSet<u32>,
    model_dir: PathBuf,
}

impl LocalModelBackend {
    /// Loads the model and tokenizer from the configured directory.
    pub fn load(config: &LocalModelConfig) -> Result<Self, BackendBuildError> {
        let model_path = config.model_dir.join("model.onnx");
        let tokenizer_path = config.model_dir.join("tokenizer.json");

        if !model_path.exists() {
            return Err(BackendBuildError::ModelLoad(format!(
                "model file not found: {}",
                model_path.display()
            )));
        }
        if !tokenizer_path.exists() {
            return Err(BackendBuildError::ModelLoad(format!(
                "tokenizer file not found: {}",
                tokenizer_path.display()
            )));
        }

        let session = Session::builder()
            .map_err(|e: ort::Error| BackendBuildError::ModelLoad(e.to_string()))?
            .with_intra_threads(config.intra_threads)
            .map_err(|e: ort::Error| BackendBuildError::ModelLoad(e.to_string()))?
            .commit_from_file(&model_path)
            .map_err(|e: ort::Error| {
                BackendBuildError::ModelLoad(format!("ONNX load failed: {e}"))
            })?;

        let tokenizer = tokenizers::Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| BackendBuildError::ModelLoad(format!("tokenizer load failed: {e}")))?;

        let eos_ids = config
            .eos_tokens
            .iter()
            .filter_map(|t| tokenizer.token_to_id(t))
            .collect();

        tracing::info!(
            model_dir = %config.model_dir.display(),
            "local model loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            eos_ids,
            model_dir: config.model_dir.clone(),
        })
    }

    /// Runs the blocking generation loop for one prompt.
    fn run_generation(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, GenerationError> {
        let encoding = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|e| GenerationError::malformed(format!("tokenization failed: {e}")))?;

        let mut token_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let prompt_len = token_ids.len();
        let mut generated: Vec<u32> = Vec::new();
        let mut rng = rand::thread_rng();

        for _ in 0..params.max_new_tokens() {
            let mut logits = self.forward(&token_ids)?;

            apply_repetition_penalty(&mut logits, &token_ids, params.repetition_penalty());
            let next = sample_from_logits(
                &logits,
                params.temperature(),
                params.top_p(),
                rng.gen::<f32>(),
            );

            if self.eos_ids.contains(&next) {
                break;
            }
            generated.push(next);
            token_ids.push(next as i64);
        }

        debug_assert_eq!(token_ids.len(), prompt_len + generated.len());

        self.tokenizer
            .decode(&generated, true)
            .map(|text| text.trim().to_string())
            .map_err(|e| GenerationError::malformed(format!("decode failed: {e}")))
    }

    /// One forward pass; returns the logits for the final position.
    fn forward(&self, token_ids: &[i64]) -> Result<Vec<f32>, GenerationError> {
        use ort::value::TensorRef;

        let seq_len = token_ids.len();
        let attention_mask = vec![1i64; seq_len];

        let ids_array = ndarray::Array2::from_shape_vec((1, seq_len), token_ids.to_vec())
            .map_err(|e| GenerationError::malformed(e.to_string()))?;
        let mask_array = ndarray::Array2::from_shape_vec((1, seq_len), attention_mask)
            .map_err(|e| GenerationError::malformed(e.to_string()))?;

        let ids_tensor = TensorRef::from_array_view(&ids_array)
            .map_err(|e| GenerationError::malformed(e.to_string()))?;
        let mask_tensor = TensorRef::from_array_view(&mask_array)
            .map_err(|e| GenerationError::malformed(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| GenerationError::unavailable("model session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![ids_tensor, mask_tensor])
            .map_err(|e| GenerationError::unavailable(format!("inference failed: {e}")))?;

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| GenerationError::malformed(format!("logit extraction failed: {e}")))?;

        // Expected shape: [1, seq_len, vocab]
        if shape.len() != 3 || shape[1] as usize != seq_len {
            return Err(GenerationError::malformed(format!(
                "unexpected logits shape {shape:?} for sequence of {seq_len}"
            )));
        }

        let vocab = shape[2] as usize;
        let last = (seq_len - 1) * vocab;
        Ok(data[last..last + vocab].to_vec())
    }
}

#[async_trait]
impl GenerationBackend for LocalModelBackend {
    async fn generate(
        &self,
        turns: &[Turn],
        params: &GenerationParams,
    ) -> Result<String, GenerationError> {
        let prompt = flatten_prompt(turns);
        // CPU-bound; keep the async workers free while the model runs.
        tokio::task::block_in_place(|| self.run_generation(&prompt, params))
    }

    fn info(&self) -> BackendInfo {
        BackendInfo::new(
            "local",
            self.model_dir.display().to_string(),
            "cpu",
        )
    }
}

/// Penalizes tokens already present in the sequence: positive logits are
/// divided by the penalty, negative ones multiplied.
fn apply_repetition_penalty(logits: &mut [f32], sequence: &[i64], penalty: f32) {
    if (penalty - 1.0).abs() < f32::EPSILON {
        return;
    }
    let seen: HashSet<usize> = sequence
        .iter()
        .filter(|&&id| id >= 0 && (id as usize) < logits.len())
        .map(|&id| id as usize)
        .collect();

    for idx in seen {
        let l = logits[idx];
        logits[idx] = if l > 0.0 { l / penalty } else { l * penalty };
    }
}

/// Samples a token id from logits under temperature and nucleus (top-p)
/// sampling. `random` must be uniform in [0, 1).
///
/// Temperature at (or indistinguishable from) zero collapses to argmax.
fn sample_from_logits(logits: &[f32], temperature: f32, top_p: f32, random: f32) -> u32 {
    debug_assert!(!logits.is_empty());

    if temperature <= f32::EPSILON {
        return argmax(logits);
    }

    // Softmax with temperature, stabilized by the max logit.
    let max_logit = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits
        .iter()
        .map(|&l| ((l - max_logit) / temperature).exp())
        .collect();
    let total: f32 = exps.iter().sum();

    let mut indexed: Vec<(usize, f32)> = exps
        .iter()
        .enumerate()
        .map(|(i, &e)| (i, e / total))
        .collect();
    indexed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    // Nucleus: keep the smallest prefix whose mass reaches top_p.
    let mut nucleus_mass = 0.0;
    let mut nucleus_end = 0;
    for (i, (_, p)) in indexed.iter().enumerate() {
        nucleus_mass += p;
        nucleus_end = i + 1;
        if nucleus_mass >= top_p {
            break;
        }
    }
    let nucleus = &indexed[..nucleus_end.max(1)];

    let target = random * nucleus_mass;
    let mut cumulative = 0.0;
    for &(idx, p) in nucleus {
        cumulative += p;
        if cumulative >= target {
            return idx as u32;
        }
    }
    nucleus[nucleus.len() - 1].0 as u32
}

fn argmax(logits: &[f32]) -> u32 {
    logits
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i as u32)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_model_dir_fails_to_load() {
        let config = LocalModelConfig::new("/nonexistent/model/dir");
        let result = LocalModelBackend::load(&config);
        assert!(matches!(result, Err(BackendBuildError::ModelLoad(_))));
    }

    #[test]
    fn zero_temperature_is_greedy() {
        let logits = vec![0.1, 3.0, -1.0, 2.0];
        assert_eq!(sample_from_logits(&logits, 0.0, 0.9, 0.7), 1);
    }

    #[test]
    fn sampling_stays_inside_nucleus() {
        // One dominant token: any random draw lands on it with tight top_p.
        let logits = vec![10.0, 0.0, 0.0, 0.0];
        for random in [0.0, 0.3, 0.7, 0.99] {
            assert_eq!(sample_from_logits(&logits, 1.0, 0.5, random), 0);
        }
    }

    #[test]
    fn repetition_penalty_discourages_seen_tokens() {
        let mut logits = vec![2.0, 2.0, -2.0];
        apply_repetition_penalty(&mut logits, &[0, 2], 2.0);

        assert_eq!(logits[0], 1.0); // positive logit divided
        assert_eq!(logits[1], 2.0); // unseen token untouched
        assert_eq!(logits[2], -4.0); // negative logit multiplied
    }

    #[test]
    fn unit_penalty_changes_nothing() {
        let mut logits = vec![1.0, -1.0];
        apply_repetition_penalty(&mut logits, &[0, 1], 1.0);
        assert_eq!(logits, vec![1.0, -1.0]);
    }
}
