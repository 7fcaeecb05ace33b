// ============================================================
// Layer 4: Lazy One-Hot Stream
// ============================================================
// Feeds the from-scratch classifier one name per step.
//
// Names are kept as letter positions in ALL_LETTERS; the
// [len, 55] one-hot matrix is only built when the training
// loop pulls the example:
//
//   "Abe" -> [26, 1, 4] -> ┌ 0 … 1 … 0 ┐  row per letter
//                          │ 0 1 … … 0 │
//                          └ 0 … 1 … 0 ┘
//
// Like the batched loaders, a training stream is reshuffled
// on every pass with a seeded RNG; an evaluation stream keeps
// its order.

use std::cell::RefCell;

use burn::prelude::*;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::data::preprocessor::ALL_LETTERS;
use crate::domain::error::{CoreError, CoreResult};
use crate::domain::labels::LabelSet;
use crate::domain::traits::{BatchSource, RawExample};

/// Size of the one-hot alphabet
pub const N_LETTERS: usize = ALL_LETTERS.len();

/// Position of `c` in ALL_LETTERS
pub fn letter_index(c: char) -> CoreResult<usize> {
    ALL_LETTERS
        .find(c)
        .ok_or(CoreError::UnknownSymbol { symbol: c })
}

/// One-hot matrix of shape [len, N_LETTERS] for an already folded name.
pub fn line_to_tensor<B: Backend>(name: &str, device: &B::Device) -> CoreResult<Tensor<B, 2>> {
    let letters = name.chars().map(letter_index).collect::<CoreResult<Vec<_>>>()?;
    if letters.is_empty() {
        return Err(CoreError::EmptySequence);
    }
    Ok(one_hot(&letters, device))
}

fn one_hot<B: Backend>(letters: &[usize], device: &B::Device) -> Tensor<B, 2> {
    let mut values = vec![0.0f32; letters.len() * N_LETTERS];
    for (row, &letter) in letters.iter().enumerate() {
        values[row * N_LETTERS + letter] = 1.0;
    }
    Tensor::from_data(TensorData::new(values, [letters.len(), N_LETTERS]), device)
}

// ─── OneHotExample ────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct OneHotExample<B: Backend> {
    /// [len, N_LETTERS]
    pub input: Tensor<B, 2>,
    pub label: usize,
}

// ─── OneHotStream ─────────────────────────────────────────────────────────────
pub struct OneHotStream<B: Backend> {
    names:   Vec<(Vec<usize>, usize)>,
    rng:     Option<RefCell<StdRng>>,
    device:  B::Device,
}

impl<B: Backend> OneHotStream<B> {
    /// Index every example; `shuffle_seed` is Some for training streams.
    pub fn new(
        examples: &[RawExample],
        labels: &LabelSet,
        shuffle_seed: Option<u64>,
        device: B::Device,
    ) -> CoreResult<Self> {
        let mut names = Vec::with_capacity(examples.len());
        for example in examples {
            let label_name = example.label.as_deref().ok_or_else(|| {
                CoreError::InvalidConfig(format!("name '{}' has no category", example.text))
            })?;
            let letters = example.text.chars().map(letter_index).collect::<CoreResult<Vec<_>>>()?;
            if letters.is_empty() {
                return Err(CoreError::EmptySequence);
            }
            names.push((letters, labels.encode(label_name)?));
        }

        Ok(Self {
            names,
            rng: shuffle_seed.map(|seed| RefCell::new(StdRng::seed_from_u64(seed))),
            device,
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn example(&self, index: usize) -> OneHotExample<B> {
        let (letters, label) = &self.names[index];
        OneHotExample { input: one_hot(letters, &self.device), label: *label }
    }
}

impl<B: Backend> BatchSource<OneHotExample<B>> for OneHotStream<B> {
    fn batches(&self) -> Box<dyn Iterator<Item = OneHotExample<B>> + '_> {
        let mut order: Vec<usize> = (0..self.names.len()).collect();
        if let Some(rng) = &self.rng {
            order.shuffle(&mut *rng.borrow_mut());
        }
        Box::new(order.into_iter().map(move |i| self.example(i)))
    }
}
