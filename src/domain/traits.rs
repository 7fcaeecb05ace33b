// ============================================================
// Layer 3: Core Traits (Abstractions)
// ============================================================
// Seams between the layers:
//
//   CorpusSource -> implemented by the loaders in Layer 4
//   BatchSource  -> anything the training loop can pull one
//                   epoch of batches from (a burn DataLoader,
//                   or the lazy one-hot stream)

use rand::RngCore;

use crate::domain::error::CoreResult;

/// One raw training example: a name and, for classification, its category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawExample {
    pub text:  String,
    pub label: Option<String>,
}

impl RawExample {
    pub fn unlabelled(text: impl Into<String>) -> Self {
        Self { text: text.into(), label: None }
    }

    pub fn labelled(text: impl Into<String>, label: impl Into<String>) -> Self {
        Self { text: text.into(), label: Some(label.into()) }
    }
}

// ─── CorpusSource ─────────────────────────────────────────────────────────────
/// Any component that can load the raw examples of a corpus.
///
/// Implementations shuffle with the supplied RNG so a seeded
/// run is reproducible.
pub trait CorpusSource {
    fn load_all(&self, rng: &mut dyn RngCore) -> CoreResult<Vec<RawExample>>;

    /// Category names in label-id order. Empty for unlabelled corpora.
    fn categories(&self) -> CoreResult<Vec<String>> {
        Ok(Vec::new())
    }
}

// ─── BatchSource ──────────────────────────────────────────────────────────────
/// Yields one epoch worth of batches each time `batches` is called.
pub trait BatchSource<T> {
    fn batches(&self) -> Box<dyn Iterator<Item = T> + '_>;
}
