// ============================================================
// Layer 3: Core Error Taxonomy
// ============================================================
// Every fallible operation below the application layer returns
// CoreError. The application and CLI layers wrap it in anyhow,
// so a caller can still downcast and react to one kind, e.g.
// skip a character on UnknownSymbol instead of aborting.
//
// None of these are retried internally.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Corpus, vocabulary, label or checkpoint file missing or unreadable
    #[error("cannot access '{path}': {reason}")]
    DataAccess { path: String, reason: String },

    /// A character that the loaded vocabulary does not contain
    #[error("symbol {symbol:?} is not in the vocabulary")]
    UnknownSymbol { symbol: char },

    /// An id outside the vocabulary or label set
    #[error("id {id} is not assigned")]
    UnknownId { id: usize },

    /// Hidden-state or batch tensor shape mismatch
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    Shape { expected: Vec<usize>, actual: Vec<usize> },

    /// A recurrent forward pass was asked to consume zero time steps
    #[error("cannot run a recurrent pass over an empty sequence")]
    EmptySequence,

    /// Loss became NaN or infinite
    #[error("training diverged at epoch {epoch}: loss = {loss}")]
    TrainingDivergence { epoch: usize, loss: f64 },

    /// A partition that the training loop needs produced no batches
    #[error("the {partition} partition is empty")]
    EmptyPartition { partition: &'static str },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("text normalization failed: {0}")]
    Normalization(String),
}

impl CoreError {
    /// Wrap an io::Error together with the path that caused it
    pub fn data_access(path: impl AsRef<std::path::Path>, err: impl std::fmt::Display) -> Self {
        CoreError::DataAccess {
            path:   path.as_ref().display().to_string(),
            reason: err.to_string(),
        }
    }
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
