// ============================================================
// Layer 6: Checkpoint Manager
// ============================================================
// One best-model file per variant, plus the JSON side files
// inference needs to rebuild that model.
//
// File naming, for template "name_gen{}" and variant "LSTM":
//
//   <dir>/
//     name_genLSTM.mpk.gz              best weights so far
//     train_config_LSTM.json           architecture + hyperparameters
//     history_LSTM.json                per-epoch losses of the last run
//
// Weights are serialised with Burn's NamedMpkGzFileRecorder at
// full precision. A save first writes name_genLSTM_partial.mpk.gz
// and then renames it over the real file, so an inference
// process never reads a half-written checkpoint.
//
// The recorder sets the extension itself, which is why dots in
// the stem are replaced by underscores.

use std::{
    fs,
    path::{Path, PathBuf},
};

use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};
use serde::{de::DeserializeOwned, Serialize};

use crate::domain::error::{CoreError, CoreResult};
use crate::domain::history::History;

const WEIGHTS_EXT: &str = "mpk.gz";

type WeightsRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

pub struct CheckpointManager {
    dir: PathBuf,
    /// File stem template; `{}` is replaced by the variant name
    template: String,
}

impl CheckpointManager {
    /// Create the manager, creating `dir` (like `mkdir -p`) if needed.
    pub fn new(dir: impl Into<PathBuf>, template: impl Into<String>) -> CoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| CoreError::data_access(&dir, e))?;
        Ok(Self { dir, template: template.into() })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File stem for `variant`, e.g. "name_genLSTM"
    pub fn stem(&self, variant: &str) -> String {
        let stem = if self.template.contains("{}") {
            self.template.replace("{}", variant)
        } else {
            format!("{}{variant}", self.template)
        };
        stem.replace('.', "_")
    }

    pub fn model_path(&self, variant: &str) -> PathBuf {
        self.dir.join(format!("{}.{WEIGHTS_EXT}", self.stem(variant)))
    }

    pub fn has_model(&self, variant: &str) -> bool {
        self.model_path(variant).is_file()
    }

    /// Persist `model` as the best checkpoint of `variant`.
    pub fn save_model<B: Backend, M: Module<B>>(&self, variant: &str, model: &M) -> CoreResult<()> {
        let partial = self.dir.join(format!("{}_partial", self.stem(variant)));
        let written = partial.with_extension(WEIGHTS_EXT);
        let target  = self.model_path(variant);

        WeightsRecorder::new()
            .record(model.clone().into_record(), partial)
            .map_err(|e| CoreError::Checkpoint(format!("cannot write '{}': {e}", written.display())))?;
        fs::rename(&written, &target).map_err(|e| CoreError::data_access(&target, e))?;

        tracing::debug!("Saved checkpoint '{}'", target.display());
        Ok(())
    }

    /// Load the weights of `variant` into `model`.
    ///
    /// `model` must have the architecture the checkpoint was saved with.
    pub fn load_model<B: Backend, M: Module<B>>(
        &self,
        variant: &str,
        model:   M,
        device:  &B::Device,
    ) -> CoreResult<M> {
        let path = self.model_path(variant);
        if !path.is_file() {
            return Err(CoreError::data_access(&path, "no checkpoint found, train this variant first"));
        }

        let record = WeightsRecorder::new()
            .load(self.dir.join(self.stem(variant)), device)
            .map_err(|e| CoreError::Checkpoint(format!("cannot load '{}': {e}", path.display())))?;

        tracing::info!("Loaded checkpoint '{}'", path.display());
        Ok(model.load_record(record))
    }

    pub fn config_path(&self, variant: &str) -> PathBuf {
        self.dir.join(format!("train_config_{variant}.json"))
    }

    /// Save the training configuration so inference can rebuild the model.
    pub fn save_config<T: Serialize>(&self, variant: &str, cfg: &T) -> CoreResult<()> {
        let path = self.config_path(variant);
        write_json(&path, cfg)?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config<T: DeserializeOwned>(&self, variant: &str) -> CoreResult<T> {
        read_json(&self.config_path(variant))
    }

    pub fn save_history(&self, variant: &str, history: &History) -> CoreResult<()> {
        write_json(&self.dir.join(format!("history_{variant}.json")), history)
    }
}

pub(crate) fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> CoreResult<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).map_err(|e| CoreError::data_access(path, e))
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> CoreResult<T> {
    let json = fs::read_to_string(path).map_err(|e| CoreError::data_access(path, e))?;
    Ok(serde_json::from_str(&json)?)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::nn::{Linear, LinearConfig};

    type TestBackend = NdArray;

    #[test]
    fn test_stem_substitutes_variant() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path(), "name_gen{}").unwrap();
        assert_eq!(ckpt.stem("LSTM"), "name_genLSTM");
        assert!(ckpt.model_path("GRU").ends_with("name_genGRU.mpk.gz"));

        let dotted = CheckpointManager::new(dir.path(), "model.v2_{}").unwrap();
        assert_eq!(dotted.stem("RNN"), "model_v2_RNN");
    }

    #[test]
    fn test_save_then_load_restores_weights() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path(), "layer{}").unwrap();
        let device = Default::default();

        let saved: Linear<TestBackend> = LinearConfig::new(3, 2).init(&device);
        assert!(!ckpt.has_model("X"));
        ckpt.save_model::<TestBackend, _>("X", &saved).unwrap();
        assert!(ckpt.has_model("X"));
        assert!(!dir.path().join("layerX_partial.mpk.gz").exists());

        let fresh: Linear<TestBackend> = LinearConfig::new(3, 2).init(&device);
        let loaded = ckpt.load_model::<TestBackend, _>("X", fresh, &device).unwrap();

        let a: Vec<f32> = saved.weight.val().into_data().iter::<f32>().collect();
        let b: Vec<f32> = loaded.weight.val().into_data().iter::<f32>().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_missing_checkpoint_is_data_access_error() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path(), "m{}").unwrap();
        let model: Linear<TestBackend> = LinearConfig::new(1, 1).init(&Default::default());
        let err = ckpt.load_model::<TestBackend, _>("RNN", model, &Default::default());
        assert!(matches!(err, Err(CoreError::DataAccess { .. })));
    }

    #[test]
    fn test_config_round_trip() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path(), "m{}").unwrap();
        ckpt.save_config("GRU", &vec![1usize, 2, 3]).unwrap();
        assert!(dir.path().join("train_config_GRU.json").exists());
        let back: Vec<usize> = ckpt.load_config("GRU").unwrap();
        assert_eq!(back, vec![1, 2, 3]);
    }
}
