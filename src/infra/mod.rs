// ============================================================
// Layer 6: Infrastructure Layer
// ============================================================
// Everything that touches the artifact directory:
//
//   checkpoint.rs   best weights per variant (Burn recorder),
//                   training config and history as JSON
//
//   vocab_store.rs  symbol tables and label set; loaded when
//                   present, built and saved otherwise
//
//   metrics.rs      per-epoch CSV log
//
// All of it returns CoreError::DataAccess for filesystem
// failures, with the offending path attached.

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Vocabulary and label persistence
pub mod vocab_store;

/// Training metrics CSV logger
pub mod metrics;
