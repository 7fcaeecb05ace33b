#![recursion_limit = "256"]

// ============================================================
// name-rnn
// ============================================================
// Character-level recurrent models for names:
//
//   generator    RNN / LSTM / GRU next-character model, sampled
//                with temperature and top-k
//   classifier   RNN / LSTM / GRU over embedded characters, the
//                last step projected to category logits
//   one-hot      the small two-linear-layer RNN fed one-hot
//                ASCII letters
//
// Layers, outermost first: cli → application → ml / data / infra
// → domain.

pub mod cli;
pub mod application;
pub mod domain;
pub mod data;
pub mod ml;
pub mod infra;
