// ============================================================
// Layer 2: Inference Use Cases
// ============================================================
// Rebuild a trained model from the artifact directory and use it:
//
//   Step 1: Read train_config_<VARIANT>.json   (Layer 6 - infra)
//   Step 2: Load vocabulary and/or labels      (Layer 6 - infra)
//   Step 3: Rebuild the architecture, load the
//           best checkpoint into it            (Layer 5 - ml)
//   Step 4: Generate names or classify one     (Layer 5 - ml)
//
// A config saved by a different task is rejected, so a generator
// checkpoint is never loaded into a classifier.

use std::path::Path;

use anyhow::{bail, Result};
use burn::prelude::*;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::application::train_use_case::{Task, TrainConfig};
use crate::domain::{
    cell::CellKind,
    error::CoreError,
    labels::LabelSet,
    vocabulary::Vocabulary,
};
use crate::infra::{checkpoint::CheckpointManager, vocab_store::VocabStore};
use crate::ml::{
    generator::{NameGenerator, SamplingConfig},
    inferencer::{Classifier, OneHotClassifier, Prediction},
    InferBackend,
};

// ─── Generation Configuration ────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateConfig {
    pub start_text:  String,
    /// Number of independent names to sample
    pub count:       usize,
    pub max_length:  usize,
    pub temperature: f64,
    pub top_k:       Option<usize>,
    /// Fixed seed for reproducible output
    pub seed:        Option<u64>,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        let sampling = SamplingConfig::default();
        Self {
            start_text:  "A".to_string(),
            count:       5,
            max_length:  sampling.max_length,
            temperature: sampling.temperature,
            top_k:       sampling.top_k,
            seed:        None,
        }
    }
}

impl GenerateConfig {
    pub fn sampling(&self) -> SamplingConfig {
        SamplingConfig {
            max_length:  self.max_length,
            temperature: self.temperature,
            top_k:       self.top_k,
        }
    }
}

/// Saved training config of `variant` plus a checkpoint manager for it.
fn open_run(artifact_dir: &str, variant: &str, expected: Task) -> Result<(TrainConfig, CheckpointManager)> {
    let dir = Path::new(artifact_dir);
    if !dir.is_dir() {
        return Err(CoreError::data_access(dir, "artifact directory not found, train a model first").into());
    }

    let cfg: TrainConfig = CheckpointManager::new(dir, "{}")?.load_config(variant)?;
    if cfg.task != expected {
        bail!(CoreError::InvalidConfig(format!(
            "'{}' holds a {:?} model, expected {:?}",
            artifact_dir, cfg.task, expected
        )));
    }
    let checkpoints = CheckpointManager::new(dir, cfg.checkpoint_template.clone())?;
    Ok((cfg, checkpoints))
}

fn load_vocab(store: &VocabStore) -> Result<Vocabulary> {
    match store.load()? {
        Some(vocab) => Ok(vocab),
        None => Err(CoreError::data_access(store.dir(), "no vocabulary found").into()),
    }
}

fn load_labels(store: &VocabStore) -> Result<LabelSet> {
    match store.load_labels()? {
        Some(labels) => Ok(labels),
        None => Err(CoreError::data_access(store.dir(), "no label set found").into()),
    }
}

// ─── GenerateUseCase ─────────────────────────────────────────────────────────
pub struct GenerateUseCase {
    generator: NameGenerator<InferBackend>,
}

impl GenerateUseCase {
    pub fn new(artifact_dir: &str, cell: CellKind) -> Result<Self> {
        let (cfg, checkpoints) = open_run(artifact_dir, &cell.to_string(), Task::Generator)?;
        let vocab  = load_vocab(&VocabStore::new(artifact_dir))?;
        let device = <InferBackend as Backend>::Device::default();

        let model = cfg.generator_model(vocab.size()).init::<InferBackend>(&device);
        let model = checkpoints.load_model::<InferBackend, _>(&cfg.variant(), model, &device)?;
        Ok(Self { generator: NameGenerator::new(model, vocab) })
    }

    /// `cfg.count` names, each starting with `cfg.start_text`.
    pub fn generate(&self, cfg: &GenerateConfig) -> Result<Vec<String>> {
        let mut rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None       => StdRng::from_entropy(),
        };
        let names = self
            .generator
            .generate_many(&cfg.start_text, cfg.count, &cfg.sampling(), &mut rng)?;
        Ok(names)
    }
}

// ─── ClassifyUseCase ─────────────────────────────────────────────────────────
pub struct ClassifyUseCase {
    classifier: Classifier<InferBackend>,
}

impl ClassifyUseCase {
    pub fn new(artifact_dir: &str, cell: CellKind, pad_length: usize) -> Result<Self> {
        if pad_length == 0 {
            bail!(CoreError::InvalidConfig("pad length must be at least 1".to_string()));
        }
        let (cfg, checkpoints) = open_run(artifact_dir, &cell.to_string(), Task::Classifier)?;
        let store  = VocabStore::new(artifact_dir);
        let vocab  = load_vocab(&store)?;
        let labels = load_labels(&store)?;
        let device = <InferBackend as Backend>::Device::default();

        let model = cfg.classifier_model(vocab.size(), labels.len()).init::<InferBackend>(&device);
        let model = checkpoints.load_model::<InferBackend, _>(&cfg.variant(), model, &device)?;
        Ok(Self { classifier: Classifier::new(model, vocab, labels, pad_length, device) })
    }

    pub fn predict(&self, name: &str) -> Result<Prediction> {
        Ok(self.classifier.predict(name)?)
    }

    pub fn labels(&self) -> &LabelSet {
        self.classifier.labels()
    }
}

// ─── OneHotClassifyUseCase ───────────────────────────────────────────────────
pub struct OneHotClassifyUseCase {
    classifier: OneHotClassifier<InferBackend>,
}

impl OneHotClassifyUseCase {
    pub fn new(artifact_dir: &str) -> Result<Self> {
        let variant = TrainConfig::for_onehot().variant();
        let (cfg, checkpoints) = open_run(artifact_dir, &variant, Task::OneHot)?;
        let labels = load_labels(&VocabStore::new(artifact_dir))?;
        let device = <InferBackend as Backend>::Device::default();

        let model = cfg.onehot_model(labels.len()).init::<InferBackend>(&device);
        let model = checkpoints.load_model::<InferBackend, _>(&variant, model, &device)?;
        Ok(Self { classifier: OneHotClassifier::new(model, labels, device) })
    }

    pub fn predict(&self, name: &str) -> Result<Prediction> {
        Ok(self.classifier.predict(name)?)
    }

    pub fn labels(&self) -> &LabelSet {
        self.classifier.labels()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    use crate::application::fixtures::{quick, write_categories, write_names};
    use crate::application::train_use_case::TrainUseCase;
    use crate::ml::inferencer::INFERENCE_PAD_LENGTH;

    fn trained(cfg: TrainConfig, corpus: impl Fn(&Path) -> std::path::PathBuf) -> (tempfile::TempDir, String) {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        TrainUseCase::new(quick(cfg, corpus(dir.path()), &out)).execute().unwrap();
        (dir, out.to_string_lossy().into_owned())
    }

    #[test]
    fn test_generate_respects_prefix_count_and_length() {
        let (_dir, out) = trained(TrainConfig::for_generator(), write_names);
        let use_case = GenerateUseCase::new(&out, CellKind::Gru).unwrap();

        let cfg   = GenerateConfig { start_text: "Al".into(), count: 4, max_length: 6, seed: Some(7), ..Default::default() };
        let names = use_case.generate(&cfg).unwrap();
        assert_eq!(names.len(), 4);
        assert!(names.iter().all(|n| n.starts_with("Al") && n.chars().count() <= 6));

        // same seed, same names
        assert_eq!(use_case.generate(&cfg).unwrap(), names);
    }

    #[test]
    fn test_generate_reports_unknown_start_symbol() {
        let (_dir, out) = trained(TrainConfig::for_generator(), write_names);
        let use_case = GenerateUseCase::new(&out, CellKind::Gru).unwrap();

        let cfg = GenerateConfig { start_text: "Zed".into(), seed: Some(1), ..Default::default() };
        let err = use_case.generate(&cfg).unwrap_err();
        assert!(matches!(err.downcast_ref::<CoreError>(), Some(CoreError::UnknownSymbol { symbol: 'Z' })));
    }

    #[test]
    fn test_untrained_variant_is_data_access_error() {
        let (_dir, out) = trained(TrainConfig::for_generator(), write_names);
        let err = GenerateUseCase::new(&out, CellKind::Rnn).err().unwrap();
        assert!(matches!(err.downcast_ref::<CoreError>(), Some(CoreError::DataAccess { .. })));

        let missing = GenerateUseCase::new("/definitely/not/here", CellKind::Gru).err().unwrap();
        assert!(matches!(missing.downcast_ref::<CoreError>(), Some(CoreError::DataAccess { .. })));
    }

    #[test]
    fn test_classify_returns_known_label() {
        let (_dir, out) = trained(TrainConfig::for_classifier(), write_categories);
        let use_case = ClassifyUseCase::new(&out, CellKind::Gru, INFERENCE_PAD_LENGTH).unwrap();

        let p = use_case.predict("Kelly").unwrap();
        assert!(["Czech", "Irish"].contains(&p.label.as_str()));
        assert_eq!(p.scores.len(), use_case.labels().len());

        let err = use_case.predict("Kelly7").unwrap_err();
        assert!(matches!(err.downcast_ref::<CoreError>(), Some(CoreError::UnknownSymbol { symbol: '7' })));
    }

    #[test]
    fn test_task_mismatch_is_rejected() {
        let (_dir, out) = trained(TrainConfig::for_classifier(), write_categories);
        let err = GenerateUseCase::new(&out, CellKind::Gru).err().unwrap();
        assert!(matches!(err.downcast_ref::<CoreError>(), Some(CoreError::InvalidConfig(_))));
    }

    #[test]
    fn test_onehot_classify_folds_accents() {
        let (_dir, out) = trained(TrainConfig::for_onehot(), write_categories);
        let use_case = OneHotClassifyUseCase::new(&out).unwrap();

        let plain  = use_case.predict("Dvorak").unwrap();
        let accent = use_case.predict("Dvořák").unwrap();
        assert_eq!(plain, accent);
        assert_eq!(plain.scores.len(), 2);
    }
}
