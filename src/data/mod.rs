// ============================================================
// Layer 4: Data Pipeline
// ============================================================
// Everything from corpus files to tensor batches.
//
//   names.txt / names/<Category>.txt
//       │
//       ▼
//   Loader          → reads files, one RawExample per line
//       │
//       ▼
//   Preprocessor    → cleans lines, optional ASCII folding
//       │
//       ▼
//   Splitter        → train / validation / test
//       │
//       ▼
//   Encoder         → ids via the Vocabulary, then padding
//       │
//       ▼
//   NameDataset     → implements Burn's Dataset trait
//       │
//       ▼
//   NameBatcher     → stacks samples into tensor batches
//       │
//       ▼
//   DataLoader      → feeds batches to the training loop
//
// The one-hot classifier skips Encoder..DataLoader and uses
// the lazy OneHotStream instead.

/// Name-list and category-directory corpus loaders
pub mod loader;

/// Line cleaning and ASCII folding
pub mod preprocessor;

/// encode / decode / pad
pub mod encoder;

/// Positional and random-subset splitting
pub mod splitter;

/// Implements Burn's Dataset trait for encoded names
pub mod dataset;

/// Implements Burn's Batcher trait and builds DataLoaders
pub mod batcher;

/// One example per step, one-hot encoded on demand
pub mod onehot;
