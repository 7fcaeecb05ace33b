// ============================================================
// Layer 2: TrainUseCase
// ============================================================
// Runs one training pipeline end to end. Three tasks share
// the same skeleton:
//
//   Step 1: Load the corpus                  (Layer 4 - data)
//   Step 2: Load or build vocabulary/labels  (Layer 6 - infra)
//   Step 3: Split into partitions            (Layer 4 - data)
//   Step 4: Encode + pad, build loaders      (Layer 4 - data)
//   Step 5: Save config, optionally resume   (Layer 6 - infra)
//   Step 6: Run the epoch loop               (Layer 5 - ml)
//   Step 7: Test evaluation (classifiers)    (Layer 5 - ml)
//
// Task differences:
//
//   generator   names.txt, positional split train/rest, the rest
//               doubles as validation, padded at the end
//   classifier  one file per category, positional split
//               train/validation/test, padded at the start
//   one-hot     one file per category folded to ASCII letters,
//               random-subset split (test first, then validation),
//               one example per step

use std::path::PathBuf;

use anyhow::{Context, Result};
use burn::prelude::*;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::data::{
    batcher::make_loader,
    dataset::build_samples,
    encoder::PadSide,
    loader::{CategoryDirLoader, NameListLoader},
    onehot::{OneHotStream, N_LETTERS},
    preprocessor::Preprocessor,
    splitter::{check_fraction, split_positional, split_random_subset},
};
use crate::domain::{
    cell::CellKind,
    error::{CoreError, CoreResult},
    history::History,
    labels::LabelSet,
    traits::{CorpusSource, RawExample},
};
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger, vocab_store::VocabStore};
use crate::ml::{
    model::{CharRnnConfig, NameClassifierConfig},
    scratch::OneHotRnnConfig,
    trainer::{evaluate, fit, Evaluation, FitConfig, RunArtifacts},
    InferBackend, TrainBackend,
};

/// Which pipeline a run executes. Saved with the config so
/// inference can refuse a checkpoint of another task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Task {
    /// Next-character model over one name list
    Generator,
    /// Embedding classifier over a category directory
    Classifier,
    /// One-hot classifier over ASCII-folded names
    OneHot,
}

// ─── Training Configuration ──────────────────────────────────────────────────
/// All settings of one training run.
///
/// Saved as JSON next to the checkpoint so inference can rebuild
/// the same architecture. Start from `for_task` and override
/// single fields; `validate` runs before any file is touched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub task:                Task,
    /// Name-list file (generator) or category directory (classifiers)
    pub corpus:              String,
    /// Checkpoints, vocabulary, labels, config, history, metrics
    pub artifact_dir:        String,
    /// Checkpoint file stem; `{}` is replaced with the variant name
    pub checkpoint_template: String,
    /// Recurrent cell; ignored by the one-hot task
    pub cell:                CellKind,
    pub batch_size:          usize,
    /// Upper bound on epochs; early stopping may end sooner
    pub epochs:              usize,
    pub learning_rate:       f64,
    /// Non-improving epochs in a row before training stops
    pub patience:            usize,
    /// Maximum gradient L2 norm
    pub grad_clip:           f32,
    pub hidden_size:         usize,
    pub embedding_size:      usize,
    /// Dropout before the generator's output layer
    pub dropout:             f64,
    /// Positional split: share of all names used for training
    pub train_fraction:      f64,
    /// Share of what is left after the train (or test) cut
    pub val_fraction:        f64,
    /// One-hot task: share of all names held out for testing
    pub test_fraction:       f64,
    /// Pad length; None pads to the longest name of the corpus
    pub pad_length:          Option<usize>,
    /// Log the epoch line every N epochs
    pub print_every:         usize,
    /// Seeds shuffling, splitting and weight initialisation
    pub seed:                u64,
    /// Continue from the saved checkpoint of this variant
    pub resume:              bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self::for_generator()
    }
}

impl TrainConfig {
    /// LSTM, batch 64, lr 1e-4, patience 5, 80 % training names
    pub fn for_generator() -> Self {
        Self {
            task:                Task::Generator,
            corpus:              "data/names.txt".to_string(),
            artifact_dir:        "artifacts/generator".to_string(),
            checkpoint_template: "name_gen{}".to_string(),
            cell:                CellKind::Lstm,
            batch_size:          64,
            epochs:              1000,
            learning_rate:       1e-4,
            patience:            5,
            grad_clip:           5.0,
            hidden_size:         128,
            embedding_size:      64,
            dropout:             0.2,
            train_fraction:      0.8,
            val_fraction:        0.5,
            test_fraction:       0.2,
            pad_length:          None,
            print_every:         100,
            seed:                42,
            resume:              false,
        }
    }

    /// Generator defaults with 100 epochs and a category directory
    pub fn for_classifier() -> Self {
        Self {
            task:                Task::Classifier,
            corpus:              "data/names".to_string(),
            artifact_dir:        "artifacts/classifier".to_string(),
            checkpoint_template: "name_rnn{}".to_string(),
            epochs:              100,
            print_every:         10,
            ..Self::for_generator()
        }
    }

    /// One name per step, lr 1e-3, 20 % test then 20 % validation
    pub fn for_onehot() -> Self {
        Self {
            task:                Task::OneHot,
            corpus:              "data/names".to_string(),
            artifact_dir:        "artifacts/onehot".to_string(),
            checkpoint_template: "name_rnn_{}".to_string(),
            batch_size:          1,
            epochs:              100,
            learning_rate:       1e-3,
            val_fraction:        0.2,
            test_fraction:       0.2,
            print_every:         10,
            ..Self::for_generator()
        }
    }

    pub fn for_task(task: Task) -> Self {
        match task {
            Task::Generator  => Self::for_generator(),
            Task::Classifier => Self::for_classifier(),
            Task::OneHot     => Self::for_onehot(),
        }
    }

    /// Name substituted into the checkpoint template and side files
    pub fn variant(&self) -> String {
        match self.task {
            Task::OneHot => "v1".to_string(),
            _            => self.cell.to_string(),
        }
    }

    /// InvalidConfig for zero sizes, dropout outside [0, 1) or a
    /// fraction outside (0, 1) that this task uses.
    pub fn validate(&self) -> CoreResult<()> {
        let invalid = |msg: String| Err(CoreError::InvalidConfig(msg));
        if self.batch_size == 0 {
            return invalid("batch size must be at least 1".to_string());
        }
        if self.hidden_size == 0 || self.embedding_size == 0 {
            return invalid("hidden and embedding sizes must be at least 1".to_string());
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return invalid(format!("dropout must be in [0, 1), got {}", self.dropout));
        }
        if self.pad_length == Some(0) {
            return invalid("pad length must be at least 1".to_string());
        }
        match self.task {
            Task::Generator  => check_fraction("train fraction", self.train_fraction)?,
            Task::Classifier => {
                check_fraction("train fraction", self.train_fraction)?;
                check_fraction("validation fraction", self.val_fraction)?;
            }
            Task::OneHot => {
                check_fraction("test fraction", self.test_fraction)?;
                check_fraction("validation fraction", self.val_fraction)?;
            }
        }
        self.fit_config().validate()
    }

    pub fn fit_config(&self) -> FitConfig {
        FitConfig {
            epochs:        self.epochs,
            learning_rate: self.learning_rate,
            patience:      self.patience,
            grad_clip:     self.grad_clip,
            print_every:   self.print_every,
            resumed:       self.resume,
        }
    }

    pub fn generator_model(&self, vocab_size: usize) -> CharRnnConfig {
        CharRnnConfig::new(self.cell, vocab_size)
            .with_embedding_size(self.embedding_size)
            .with_hidden_size(self.hidden_size)
            .with_dropout(self.dropout)
    }

    pub fn classifier_model(&self, vocab_size: usize, num_labels: usize) -> NameClassifierConfig {
        NameClassifierConfig::new(self.cell, vocab_size, num_labels)
            .with_embedding_size(self.embedding_size)
            .with_hidden_size(self.hidden_size)
    }

    pub fn onehot_model(&self, num_labels: usize) -> OneHotRnnConfig {
        OneHotRnnConfig::new(N_LETTERS, num_labels).with_hidden_size(self.hidden_size)
    }
}

// ─── Report ───────────────────────────────────────────────────────────────────
/// Outcome of one run, printed by the CLI.
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub variant:    String,
    pub checkpoint: PathBuf,
    pub history:    History,
    /// Held-out evaluation with the best weights (classifiers only)
    pub test:       Option<Evaluation>,
}

/// Files one run reads and writes in the artifact directory
struct RunFiles {
    variant:     String,
    checkpoints: CheckpointManager,
    metrics:     MetricsLogger,
    store:       VocabStore,
}

impl RunFiles {
    fn open(cfg: &TrainConfig) -> CoreResult<Self> {
        let variant = cfg.variant();
        Ok(Self {
            checkpoints: CheckpointManager::new(&cfg.artifact_dir, cfg.checkpoint_template.clone())?,
            metrics:     if cfg.resume {
                MetricsLogger::resume(&cfg.artifact_dir, &variant)?
            } else {
                MetricsLogger::new(&cfg.artifact_dir, &variant)?
            },
            store:       VocabStore::new(&cfg.artifact_dir),
            variant,
        })
    }

    fn artifacts(&self) -> RunArtifacts<'_> {
        RunArtifacts { checkpoints: &self.checkpoints, metrics: &self.metrics, variant: &self.variant }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
/// Runs the pipeline of `config.task` end to end.
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Validate, train and persist; see the step list at the top.
    pub fn execute(&self) -> Result<TrainReport> {
        let cfg = &self.config;
        cfg.validate()?;

        TrainBackend::seed(cfg.seed);
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let run     = RunFiles::open(cfg)?;

        tracing::info!("Training {:?} variant {} on '{}'", cfg.task, run.variant, cfg.corpus);
        let (history, test) = match cfg.task {
            Task::Generator  => (self.train_generator(&mut rng, &run)?, None),
            Task::Classifier => self.train_classifier(&mut rng, &run)?,
            Task::OneHot     => self.train_onehot(&mut rng, &run)?,
        };

        run.checkpoints.save_history(&run.variant, &history)?;
        Ok(TrainReport {
            checkpoint: run.checkpoints.model_path(&run.variant),
            variant:    run.variant,
            history,
            test,
        })
    }

    fn train_generator(&self, rng: &mut StdRng, run: &RunFiles) -> Result<History> {
        let cfg    = &self.config;
        let device = <InferBackend as Backend>::Device::default();

        // ── Steps 1-2: corpus and vocabulary ──────────────────────────────────
        let examples = NameListLoader::new(&cfg.corpus)
            .load_all(rng)
            .context("loading the name list")?;
        let vocab  = run.store.load_or_build(&texts(&examples))?;
        let length = cfg.pad_length.or_else(|| longest(&examples));

        // ── Step 3: train / rest, the rest is the validation set ──────────────
        let split = split_positional(examples, cfg.train_fraction, None)?;
        tracing::info!("Split: {} train, {} validation", split.train.len(), split.test.len());
        require_rows("training", split.train.len())?;
        require_rows("validation", split.test.len())?;

        // ── Step 4: encode, pad at the end ────────────────────────────────────
        let train = build_samples(&split.train, &vocab, None, length, PadSide::End)?;
        let valid = build_samples(&split.test, &vocab, None, length, PadSide::End)?;
        let train = make_loader::<TrainBackend>(train, cfg.batch_size, Some(cfg.seed), device.clone());
        let valid = make_loader::<InferBackend>(valid, cfg.batch_size, None, device.clone());

        // ── Steps 5-6: model and epoch loop ───────────────────────────────────
        let model = cfg.generator_model(vocab.size()).init::<TrainBackend>(&device);
        let model = self.resume(run, model, &device)?;
        run.checkpoints.save_config(&run.variant, cfg)?;

        let (_, history) = fit::<TrainBackend, _>(model, &train, &valid, &cfg.fit_config(), &run.artifacts())?;
        Ok(history)
    }

    fn train_classifier(&self, rng: &mut StdRng, run: &RunFiles) -> Result<(History, Option<Evaluation>)> {
        let cfg    = &self.config;
        let device = <InferBackend as Backend>::Device::default();

        // ── Steps 1-2: corpus, labels, vocabulary ─────────────────────────────
        let loader   = CategoryDirLoader::new(&cfg.corpus);
        let labels   = run.store.load_or_save_labels(loader.categories()?)?;
        let examples = loader.load_all(rng).context("loading the category directory")?;
        let vocab    = run.store.load_or_build(&texts(&examples))?;
        let length   = cfg.pad_length.or_else(|| longest(&examples));
        log_labels(&labels);

        // ── Step 3: train / validation / test ─────────────────────────────────
        let split      = split_positional(examples, cfg.train_fraction, Some(cfg.val_fraction))?;
        let validation = split.validation.unwrap_or_default();
        tracing::info!(
            "Split: {} train, {} validation, {} test",
            split.train.len(), validation.len(), split.test.len(),
        );
        require_rows("training", split.train.len())?;
        require_rows("validation", validation.len())?;

        // ── Step 4: encode, pad at the start ──────────────────────────────────
        let samples = |part: &[RawExample]| build_samples(part, &vocab, Some(&labels), length, PadSide::Start);
        let train = make_loader::<TrainBackend>(samples(&split.train)?, cfg.batch_size, Some(cfg.seed), device.clone());
        let valid = make_loader::<InferBackend>(samples(&validation)?, cfg.batch_size, None, device.clone());
        let test  = samples(&split.test)?;

        // ── Steps 5-6: model and epoch loop ───────────────────────────────────
        let model_cfg = cfg.classifier_model(vocab.size(), labels.len());
        let model     = self.resume(run, model_cfg.init::<TrainBackend>(&device), &device)?;
        run.checkpoints.save_config(&run.variant, cfg)?;

        let (_, history) = fit::<TrainBackend, _>(model, &train, &valid, &cfg.fit_config(), &run.artifacts())?;

        // ── Step 7: best weights on the test partition ────────────────────────
        if test.is_empty() {
            tracing::warn!("Test partition is empty, skipping test evaluation");
            return Ok((history, None));
        }
        let best = run.checkpoints.load_model::<InferBackend, _>(&run.variant, model_cfg.init::<InferBackend>(&device), &device)?;
        let test = make_loader::<InferBackend>(test, cfg.batch_size, None, device);
        let eval = evaluate::<InferBackend, _>(&best, &test, "test")?;
        log_test(&eval);
        Ok((history, Some(eval)))
    }

    fn train_onehot(&self, rng: &mut StdRng, run: &RunFiles) -> Result<(History, Option<Evaluation>)> {
        let cfg    = &self.config;
        let device = <InferBackend as Backend>::Device::default();

        // ── Steps 1-2: corpus folded to ASCII letters, labels ─────────────────
        let loader   = CategoryDirLoader::new(&cfg.corpus).with_preprocessor(Preprocessor::ascii_letters());
        let labels   = run.store.load_or_save_labels(loader.categories()?)?;
        let examples = loader.load_all(rng).context("loading the category directory")?;
        log_labels(&labels);

        // ── Step 3: test subset first, then validation subset of the rest ─────
        let (rest, test)  = split_random_subset(examples, cfg.test_fraction, rng)?;
        let (train, valid) = split_random_subset(rest, cfg.val_fraction, rng)?;
        tracing::info!("Split: {} train, {} validation, {} test", train.len(), valid.len(), test.len());
        require_rows("training", train.len())?;
        require_rows("validation", valid.len())?;

        // ── Step 4: lazy one-hot streams ──────────────────────────────────────
        let train = OneHotStream::<TrainBackend>::new(&train, &labels, Some(cfg.seed), device.clone())?;
        let valid = OneHotStream::<InferBackend>::new(&valid, &labels, None, device.clone())?;
        let test  = OneHotStream::<InferBackend>::new(&test, &labels, None, device.clone())?;

        // ── Steps 5-6: model and epoch loop ───────────────────────────────────
        let model_cfg = cfg.onehot_model(labels.len());
        let model     = self.resume(run, model_cfg.init::<TrainBackend>(&device), &device)?;
        run.checkpoints.save_config(&run.variant, cfg)?;

        let (_, history) = fit::<TrainBackend, _>(model, &train, &valid, &cfg.fit_config(), &run.artifacts())?;

        // ── Step 7: best weights on the test subset ───────────────────────────
        if test.is_empty() {
            tracing::warn!("Test partition is empty, skipping test evaluation");
            return Ok((history, None));
        }
        let best = run.checkpoints.load_model::<InferBackend, _>(&run.variant, model_cfg.init::<InferBackend>(&device), &device)?;
        let eval = evaluate::<InferBackend, _>(&best, &test, "test")?;
        log_test(&eval);
        Ok((history, Some(eval)))
    }

    /// Continue from the saved best weights when `resume` is set.
    fn resume<M: Module<TrainBackend>>(
        &self,
        run:    &RunFiles,
        model:  M,
        device: &<TrainBackend as Backend>::Device,
    ) -> Result<M> {
        if !self.config.resume {
            return Ok(model);
        }
        let model = run
            .checkpoints
            .load_model::<TrainBackend, M>(&run.variant, model, device)
            .context("resuming from the existing checkpoint")?;
        Ok(model)
    }
}

fn texts(examples: &[RawExample]) -> Vec<&str> {
    examples.iter().map(|e| e.text.as_str()).collect()
}

fn longest(examples: &[RawExample]) -> Option<usize> {
    examples.iter().map(|e| e.text.chars().count()).max()
}

fn require_rows(partition: &'static str, rows: usize) -> CoreResult<()> {
    if rows == 0 {
        return Err(CoreError::EmptyPartition { partition });
    }
    Ok(())
}

fn log_labels(labels: &LabelSet) {
    tracing::info!("{} categories: {}", labels.len(), labels.names().join(", "));
}

fn log_test(eval: &Evaluation) {
    match eval.accuracy {
        Some(acc) => tracing::info!(
            "Test: loss={:.4} | acc={:.1}% over {} names",
            eval.loss, acc * 100.0, eval.examples,
        ),
        None => tracing::info!("Test: loss={:.4} over {} names", eval.loss, eval.examples),
    }
}
