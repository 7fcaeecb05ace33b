// ============================================================
// Layer 1: CLI / Presentation Layer
// ============================================================
// Parses the command line with clap and hands each subcommand
// to a Layer 2 use case. Results are printed here and nowhere
// else; progress goes through tracing.

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{ClassifyArgs, ClassifyOnehotArgs, Commands, GenerateArgs, TrainArgs};

use crate::application::{
    infer_use_case::{ClassifyUseCase, GenerateUseCase, OneHotClassifyUseCase},
    train_use_case::{Task, TrainReport, TrainUseCase},
};
use crate::domain::labels::LabelSet;
use crate::ml::inferencer::Prediction;

#[derive(Parser, Debug)]
#[command(
    name = "name-rnn",
    version,
    about = "Train character-level RNN/LSTM/GRU models to generate and classify names."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::TrainGenerator(args)  => run_train(args, Task::Generator),
            Commands::Generate(args)        => run_generate(args),
            Commands::TrainClassifier(args) => run_train(args, Task::Classifier),
            Commands::Classify(args)        => run_classify(args),
            Commands::TrainOnehot(args)     => run_train(args, Task::OneHot),
            Commands::ClassifyOnehot(args)  => run_classify_onehot(args),
        }
    }
}

fn run_train(args: TrainArgs, task: Task) -> Result<()> {
    let report = TrainUseCase::new(args.into_config(task)).execute()?;
    print_report(&report);
    Ok(())
}

fn run_generate(args: GenerateArgs) -> Result<()> {
    let use_case = GenerateUseCase::new(&args.artifact_dir, args.cell)?;
    for name in use_case.generate(&args.into())? {
        println!("{name}");
    }
    Ok(())
}

fn run_classify(args: ClassifyArgs) -> Result<()> {
    let use_case = ClassifyUseCase::new(&args.artifact_dir, args.cell, args.pad_length)?;
    print_prediction(&args.name, &use_case.predict(&args.name)?, use_case.labels());
    Ok(())
}

fn run_classify_onehot(args: ClassifyOnehotArgs) -> Result<()> {
    let use_case = OneHotClassifyUseCase::new(&args.artifact_dir)?;
    print_prediction(&args.name, &use_case.predict(&args.name)?, use_case.labels());
    Ok(())
}

fn print_report(report: &TrainReport) {
    let h = &report.history;
    println!(
        "Training complete: {} epochs ({:?}), best val_loss={:.4}",
        h.epochs, h.stop_reason, h.best_val_loss,
    );
    if let Some(test) = &report.test {
        match test.accuracy {
            Some(acc) => println!("Test loss={:.4}, accuracy={:.1}%", test.loss, acc * 100.0),
            None      => println!("Test loss={:.4}", test.loss),
        }
    }
    println!("Best checkpoint: {}", report.checkpoint.display());
}

/// Predicted label, then the raw score of every label.
fn print_prediction(name: &str, prediction: &Prediction, labels: &LabelSet) {
    println!("{name} -> {}", prediction.label);
    for (label, score) in labels.names().iter().zip(&prediction.scores) {
        println!("  {label:<16} {score:>9.4}");
    }
}
