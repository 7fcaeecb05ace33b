// ============================================================
// Layer 3: Domain Layer
// ============================================================
// Plain Rust types and traits describing what the system
// works with: symbols, labels, training history, the error
// taxonomy. Nothing here touches burn or the filesystem.

/// Typed errors shared by every layer below the application
pub mod error;

/// Character <-> id table with the reserved padding id
pub mod vocabulary;

/// Ordered category names for classification
pub mod labels;

/// Recurrent cell variants
pub mod cell;

/// Per-epoch history and the early-stopping policy
pub mod history;

/// CorpusSource and BatchSource abstractions
pub mod traits;
