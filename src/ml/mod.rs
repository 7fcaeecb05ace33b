// ============================================================
// Layer 5: ML / Model Layer (Burn)
// ============================================================
// All model code lives here: the recurrent cells, the three
// networks built on them, the shared epoch loop, sampling and
// classification.
//
//   cell.rs        RNN / LSTM / GRU cells behind one trait,
//                  plus RecurrentUnit that runs a whole sequence
//
//   model.rs       CharRnn (next-character generator) and
//                  NameClassifier (last step → label logits),
//                  both sharing SequenceEncoder
//
//   scratch.rs     OneHotRnn, the two-linear-layer classifier
//                  fed one one-hot letter per step
//
//   trainer.rs     fit / evaluate over any Objective
//
//   generator.rs   temperature + top-k sampling
//
//   inferencer.rs  single-name classification
//
// Backends: training runs on Autodiff<InferBackend>; validation,
// test evaluation and inference run on InferBackend itself.

use burn::backend::Autodiff;

/// Recurrent cells and the cell-polymorphic sequence runner
pub mod cell;

/// Embedding-based generator and classifier
pub mod model;

/// One-hot classifier without a library cell
pub mod scratch;

/// Epoch loop with validation, checkpointing and early stopping
pub mod trainer;

/// Autoregressive name sampling
pub mod generator;

/// Name classification with a trained model
pub mod inferencer;

#[cfg(not(feature = "wgpu"))]
pub type InferBackend = burn::backend::NdArray;

#[cfg(feature = "wgpu")]
pub type InferBackend = burn::backend::Wgpu;

pub type TrainBackend = Autodiff<InferBackend>;
