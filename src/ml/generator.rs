// ============================================================
// Layer 5: Name Generator
// ============================================================
// Autoregressive sampling from a trained CharRnn.
//
//   "Al", max_length 6
//     warm-up   feed "A"              (outputs discarded)
//     step 1    feed "l"  → sample "e"
//     step 2    feed "e"  → sample "x"
//     ...       max_length - len("Al") steps in total
//
// Each step:
//   p = softmax(logits / temperature)
//   keep the top_k most likely ids (ties: lower id first)
//   draw one id from what is left
//
// The padding id decodes to "", so a sampled pad shortens the
// name without a dedicated end token. Randomness comes only
// from the caller's RNG.

use burn::{prelude::*, tensor::activation::softmax};
use rand::{
    distributions::{Distribution, WeightedIndex},
    Rng,
};
use serde::{Deserialize, Serialize};

use crate::data::encoder::encode_one;
use crate::domain::error::{CoreError, CoreResult};
use crate::domain::vocabulary::Vocabulary;
use crate::ml::cell::HiddenState;
use crate::ml::model::CharRnn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Upper bound on the generated name, start text included
    pub max_length: usize,
    /// < 1 sharpens towards the argmax, > 1 flattens
    pub temperature: f64,
    pub top_k: Option<usize>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self { max_length: 6, temperature: 1.0, top_k: None }
    }
}

impl SamplingConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if !(self.temperature > 0.0 && self.temperature.is_finite()) {
            return Err(CoreError::InvalidConfig(format!(
                "temperature must be positive, got {}",
                self.temperature
            )));
        }
        if self.top_k == Some(0) {
            return Err(CoreError::InvalidConfig("top_k must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Candidate ids and their weights, most likely first.
///
/// With `top_k` only the k most likely ids survive.
pub fn candidates(probs: &[f32], top_k: Option<usize>) -> Vec<(usize, f32)> {
    let mut ranked: Vec<(usize, f32)> = probs.iter().copied().enumerate().collect();
    // stable sort keeps the lower id first among equal probabilities
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    if let Some(k) = top_k {
        ranked.truncate(k);
    }
    ranked
}

fn sample<R: Rng + ?Sized>(candidates: &[(usize, f32)], rng: &mut R) -> CoreResult<usize> {
    let dist = WeightedIndex::new(candidates.iter().map(|&(_, w)| w))
        .map_err(|e| CoreError::InvalidConfig(format!("cannot sample next character: {e}")))?;
    Ok(candidates[dist.sample(rng)].0)
}

/// Generate one name starting with `start_text`.
///
/// `model` should be an inference model (inner backend), so
/// dropout is inactive.
pub fn generate<B: Backend, R: Rng + ?Sized>(
    model:      &CharRnn<B>,
    vocab:      &Vocabulary,
    start_text: &str,
    cfg:        &SamplingConfig,
    rng:        &mut R,
) -> CoreResult<String> {
    cfg.validate()?;
    let ids = encode_one(start_text, vocab)?;
    let Some((&last, warmup)) = ids.split_last() else {
        return Err(CoreError::EmptySequence);
    };

    let device = model.output.weight.val().device();
    let mut state: Option<HiddenState<B>> = None;
    if !warmup.is_empty() {
        let (_, warm) = model.forward(id_tensor(warmup, &device), None)?;
        state = Some(warm);
    }

    let mut name = start_text.to_string();
    let mut last = last;
    let steps = cfg.max_length.saturating_sub(ids.len());

    for _ in 0..steps {
        let (logits, next) = model.forward(id_tensor(&[last], &device), state)?;
        state = Some(next);

        let vocab_size = logits.dims()[2];
        let probs: Vec<f32> = softmax(logits.reshape([1, vocab_size]).div_scalar(cfg.temperature), 1)
            .into_data()
            .iter::<f32>()
            .collect();

        last = sample(&candidates(&probs, cfg.top_k), &mut *rng)? as u32;
        name.push_str(&vocab.symbol_of(last)?);
    }

    Ok(name)
}

fn id_tensor<B: Backend>(ids: &[u32], device: &B::Device) -> Tensor<B, 2, Int> {
    let ids: Vec<i32> = ids.iter().map(|&id| id as i32).collect();
    Tensor::<B, 1, Int>::from_ints(ids.as_slice(), device).reshape([1, ids.len()])
}

// ─── NameGenerator ────────────────────────────────────────────────────────────
/// A loaded generator model together with its vocabulary.
pub struct NameGenerator<B: Backend> {
    model: CharRnn<B>,
    vocab: Vocabulary,
}

impl<B: Backend> NameGenerator<B> {
    pub fn new(model: CharRnn<B>, vocab: Vocabulary) -> Self {
        Self { model, vocab }
    }

    pub fn generate<R: Rng + ?Sized>(&self, start_text: &str, cfg: &SamplingConfig, rng: &mut R) -> CoreResult<String> {
        generate(&self.model, &self.vocab, start_text, cfg, rng)
    }

    /// `count` independent samples for the same start text
    pub fn generate_many<R: Rng + ?Sized>(
        &self,
        start_text: &str,
        count:      usize,
        cfg:        &SamplingConfig,
        rng:        &mut R,
    ) -> CoreResult<Vec<String>> {
        (0..count).map(|_| self.generate(start_text, cfg, &mut *rng)).collect()
    }

    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }
}
