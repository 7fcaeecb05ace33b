// ============================================================
// Layer 1: CLI Commands and Arguments
// ============================================================
// Six subcommands, a train/infer pair per task:
//
//   train-generator   / generate
//   train-classifier  / classify
//   train-onehot      / classify-onehot
//
// The three train commands share TrainArgs. Every flag there is
// optional; an omitted flag keeps the task's default from
// TrainConfig::for_task.

use clap::{Args, Subcommand};

use crate::application::{
    infer_use_case::GenerateConfig,
    train_use_case::{Task, TrainConfig},
};
use crate::domain::cell::CellKind;
use crate::ml::inferencer::INFERENCE_PAD_LENGTH;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a next-character model on a newline-separated name list
    TrainGenerator(TrainArgs),

    /// Sample new names from a trained generator
    Generate(GenerateArgs),

    /// Train an embedding classifier on a directory of <Category>.txt files
    TrainClassifier(TrainArgs),

    /// Predict the category of one name
    Classify(ClassifyArgs),

    /// Train the one-hot classifier (ASCII letters, one name per step)
    TrainOnehot(TrainArgs),

    /// Predict the category of one name with the one-hot classifier
    ClassifyOnehot(ClassifyOnehotArgs),
}

#[derive(Args, Debug, Default)]
pub struct TrainArgs {
    /// Name-list file (generator) or category directory (classifiers)
    #[arg(long)]
    pub corpus: Option<String>,

    /// Where checkpoints, vocabulary, labels and logs are written
    #[arg(long)]
    pub artifact_dir: Option<String>,

    /// Checkpoint file stem; `{}` becomes the variant name (e.g. "name_gen{}")
    #[arg(long)]
    pub checkpoint_template: Option<String>,

    /// Recurrent cell: rnn, lstm or gru (ignored by train-onehot)
    #[arg(long)]
    pub cell: Option<CellKind>,

    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Upper bound on epochs; early stopping may end the run sooner
    #[arg(long)]
    pub epochs: Option<usize>,

    #[arg(long)]
    pub lr: Option<f64>,

    /// Non-improving epochs in a row before training stops
    #[arg(long)]
    pub patience: Option<usize>,

    /// Maximum gradient L2 norm
    #[arg(long)]
    pub grad_clip: Option<f32>,

    #[arg(long)]
    pub hidden_size: Option<usize>,

    #[arg(long)]
    pub embedding_size: Option<usize>,

    #[arg(long)]
    pub dropout: Option<f64>,

    /// Share of all names used for training (positional split)
    #[arg(long)]
    pub train_fraction: Option<f64>,

    /// Share of the remaining names used for validation
    #[arg(long)]
    pub val_fraction: Option<f64>,

    /// Share of all names held out for testing (train-onehot)
    #[arg(long)]
    pub test_fraction: Option<f64>,

    /// Pad every name to this length instead of the longest one
    #[arg(long)]
    pub pad_length: Option<usize>,

    /// Log the epoch line every N epochs
    #[arg(long)]
    pub print_every: Option<usize>,

    #[arg(long)]
    pub seed: Option<u64>,

    /// Start from the saved checkpoint of this variant
    #[arg(long)]
    pub resume: bool,
}

impl TrainArgs {
    /// The task's defaults with every given flag applied on top.
    pub fn into_config(self, task: Task) -> TrainConfig {
        let d = TrainConfig::for_task(task);
        TrainConfig {
            task,
            corpus:              self.corpus.unwrap_or(d.corpus),
            artifact_dir:        self.artifact_dir.unwrap_or(d.artifact_dir),
            checkpoint_template: self.checkpoint_template.unwrap_or(d.checkpoint_template),
            cell:                self.cell.unwrap_or(d.cell),
            batch_size:          self.batch_size.unwrap_or(d.batch_size),
            epochs:              self.epochs.unwrap_or(d.epochs),
            learning_rate:       self.lr.unwrap_or(d.learning_rate),
            patience:            self.patience.unwrap_or(d.patience),
            grad_clip:           self.grad_clip.unwrap_or(d.grad_clip),
            hidden_size:         self.hidden_size.unwrap_or(d.hidden_size),
            embedding_size:      self.embedding_size.unwrap_or(d.embedding_size),
            dropout:             self.dropout.unwrap_or(d.dropout),
            train_fraction:      self.train_fraction.unwrap_or(d.train_fraction),
            val_fraction:        self.val_fraction.unwrap_or(d.val_fraction),
            test_fraction:       self.test_fraction.unwrap_or(d.test_fraction),
            pad_length:          self.pad_length.or(d.pad_length),
            print_every:         self.print_every.unwrap_or(d.print_every),
            seed:                self.seed.unwrap_or(d.seed),
            resume:              self.resume,
        }
    }
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Every generated name starts with this text
    #[arg(long, default_value = "A")]
    pub start: String,

    /// How many names to generate
    #[arg(long, default_value_t = 5)]
    pub count: usize,

    /// Maximum name length, start text included
    #[arg(long, default_value_t = 6)]
    pub max_length: usize,

    /// Below 1 sticks to likely letters, above 1 takes more risks
    #[arg(long, default_value_t = 1.0)]
    pub temperature: f64,

    /// Sample only among the k most likely letters
    #[arg(long)]
    pub top_k: Option<usize>,

    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, default_value = "artifacts/generator")]
    pub artifact_dir: String,

    #[arg(long, default_value_t = CellKind::Lstm)]
    pub cell: CellKind,
}

impl From<GenerateArgs> for GenerateConfig {
    fn from(a: GenerateArgs) -> Self {
        GenerateConfig {
            start_text:  a.start,
            count:       a.count,
            max_length:  a.max_length,
            temperature: a.temperature,
            top_k:       a.top_k,
            seed:        a.seed,
        }
    }
}

#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// The name to classify
    pub name: String,

    #[arg(long, default_value = "artifacts/classifier")]
    pub artifact_dir: String,

    #[arg(long, default_value_t = CellKind::Lstm)]
    pub cell: CellKind,

    /// Length the name is padded to (at the start) before inference
    #[arg(long, default_value_t = INFERENCE_PAD_LENGTH)]
    pub pad_length: usize,
}

#[derive(Args, Debug)]
pub struct ClassifyOnehotArgs {
    /// The name to classify
    pub name: String,

    #[arg(long, default_value = "artifacts/onehot")]
    pub artifact_dir: String,
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_omitted_flags_keep_task_defaults() {
        let cfg = TrainArgs { epochs: Some(3), cell: Some(CellKind::Gru), ..Default::default() }
            .into_config(Task::Classifier);
        assert_eq!(cfg.epochs, 3);
        assert_eq!(cfg.cell, CellKind::Gru);
        assert_eq!(cfg.checkpoint_template, "name_rnn{}");
        assert_eq!(cfg.print_every, 10);
    }

    #[test]
    fn test_parse_generate_flags() {
        let cli = Cli::try_parse_from([
            "name-rnn", "generate", "--start", "Al", "--count", "3", "--top-k", "2", "--cell", "gru",
        ])
        .unwrap();
        let Commands::Generate(args) = cli.command else { panic!("expected generate") };
        assert_eq!(args.cell, CellKind::Gru);

        let cfg = GenerateConfig::from(args);
        assert_eq!((cfg.start_text.as_str(), cfg.count, cfg.top_k, cfg.max_length), ("Al", 3, Some(2), 6));
    }

    #[test]
    fn test_parse_train_onehot() {
        let cli = Cli::try_parse_from(["name-rnn", "train-onehot", "--lr", "0.01", "--resume"]).unwrap();
        let Commands::TrainOnehot(args) = cli.command else { panic!("expected train-onehot") };
        let cfg = args.into_config(Task::OneHot);
        assert_eq!(cfg.learning_rate, 0.01);
        assert!(cfg.resume);
        assert_eq!(cfg.test_fraction, 0.2);
    }

    #[test]
    fn test_unknown_cell_is_rejected() {
        assert!(Cli::try_parse_from(["name-rnn", "classify", "Kelly", "--cell", "transformer"]).is_err());
    }
}
