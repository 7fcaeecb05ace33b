// ============================================================
// Layer 5: Training Loop
// ============================================================
// One epoch loop shared by every model in the crate. A model
// takes part by implementing Objective: turn one batch into a
// scalar loss plus the counts needed for weighted averaging.
//
// Per epoch:
//   1. train pass   forward, loss, backward, clipped Adam step
//   2. valid pass   model.valid() on the inner backend: no
//                   autodiff graph, dropout disabled
//   3. record       History + metrics CSV
//   4. checkpoint   val_loss <= best -> save (ties included)
//   5. early stop   `patience` bad epochs in a row -> stop
//
// Burn 0.16 notes:
//   - Training runs on an AutodiffBackend; model.valid() hands
//     back the same weights on B::InnerBackend, so validation
//     batches must be built for the inner backend too
//   - Gradient clipping is configured on the optimizer
//     (GradientClippingConfig::Norm)
//
// A NaN or infinite loss aborts the run with TrainingDivergence
// before anything is written for that epoch, so the saved best
// checkpoint is never replaced by diverged weights.
//
// A resumed run first measures the loaded weights on the
// validation set. That loss is the best to beat, so the
// checkpoint on disk is only replaced by weights at least as good.

use burn::{
    grad_clipping::GradientClippingConfig,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::domain::error::{CoreError, CoreResult};
use crate::domain::history::{EarlyStopping, EpochRecord, History, StopReason, Verdict};
use crate::domain::traits::BatchSource;
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::metrics::MetricsLogger;

// ─── Objective ────────────────────────────────────────────────────────────────
/// What one batch contributes to an epoch.
///
/// `loss` is the mean over `terms`; the loop multiplies it back
/// by `terms` so every epoch mean is weighted per loss term.
pub struct StepOutput<B: Backend> {
    /// Mean loss over the batch's loss terms, shape [1]
    pub loss: Tensor<B, 1>,
    /// Number of loss terms averaged into `loss`
    pub terms: usize,
    /// Number of examples in the batch
    pub examples: usize,
    /// Correct predictions, classifiers only
    pub correct: Option<usize>,
}

/// A model the epoch loop can train and evaluate.
///
/// Implemented by CharRnn (next-character loss), NameClassifier
/// (label cross-entropy) and OneHotRnn (label NLL). The inner
/// module must implement it too, for validation on the inner
/// backend.
pub trait Objective<B: Backend> {
    /// What a BatchSource yields for this model
    type Batch;

    /// Forward pass and loss for one batch
    fn objective(&self, batch: Self::Batch) -> CoreResult<StepOutput<B>>;
}

// ─── Configuration ────────────────────────────────────────────────────────────
/// Control knobs of one `fit` call.
///
/// Built from a TrainConfig by `TrainConfig::fit_config`.
#[derive(Debug, Clone)]
pub struct FitConfig {
    /// Upper bound on the epochs of this call
    pub epochs:        usize,
    /// Adam step size
    pub learning_rate: f64,
    /// Non-improving epochs in a row before stopping
    pub patience:      usize,
    /// Maximum L2 norm of the gradients
    pub grad_clip:     f32,
    /// Log the epoch line every N epochs (and on the first)
    pub print_every:   usize,
    /// The model holds checkpoint weights: measure them on the
    /// validation set before epoch 1 and use that as the best loss
    pub resumed:       bool,
}

impl FitConfig {
    pub fn validate(&self) -> CoreResult<()> {
        let invalid = |msg: &str| Err(CoreError::InvalidConfig(msg.to_string()));
        if self.epochs == 0 {
            return invalid("epochs must be at least 1");
        }
        if self.patience == 0 {
            return invalid("patience must be at least 1");
        }
        if self.print_every == 0 {
            return invalid("print_every must be at least 1");
        }
        if !(self.learning_rate >= 0.0 && self.learning_rate.is_finite()) {
            return invalid("learning rate must be a finite, non-negative number");
        }
        if !(self.grad_clip > 0.0 && self.grad_clip.is_finite()) {
            return invalid("gradient clip norm must be positive");
        }
        Ok(())
    }
}

// ─── Evaluation ───────────────────────────────────────────────────────────────
/// Loss (and accuracy) of one full pass over a partition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub loss:     f64,
    pub accuracy: Option<f64>,
    pub examples: usize,
}

#[derive(Default)]
struct PassTotals {
    loss_sum: f64,
    terms:    usize,
    examples: usize,
    correct:  Option<usize>,
}

impl PassTotals {
    fn add(&mut self, loss: f64, terms: usize, examples: usize, correct: Option<usize>) {
        // weighted by loss terms, so a short final batch counts for less
        self.loss_sum += loss * terms as f64;
        self.terms    += terms;
        self.examples += examples;
        if let Some(c) = correct {
            *self.correct.get_or_insert(0) += c;
        }
    }

    fn finish(self, partition: &'static str) -> CoreResult<Evaluation> {
        if self.terms == 0 {
            return Err(CoreError::EmptyPartition { partition });
        }
        Ok(Evaluation {
            loss:     self.loss_sum / self.terms as f64,
            accuracy: self.correct.map(|c| c as f64 / self.examples.max(1) as f64),
            examples: self.examples,
        })
    }
}

/// Forward-only pass over `source`.
pub fn evaluate<B: Backend, M: Objective<B>>(
    model:     &M,
    source:    &dyn BatchSource<M::Batch>,
    partition: &'static str,
) -> CoreResult<Evaluation> {
    let mut totals = PassTotals::default();
    for batch in source.batches() {
        let out  = model.objective(batch)?;
        let loss = out.loss.into_scalar().elem::<f64>();
        totals.add(loss, out.terms, out.examples, out.correct);
    }
    totals.finish(partition)
}

// ─── Fit ──────────────────────────────────────────────────────────────────────
/// Where a run persists its best weights and per-epoch metrics.
pub struct RunArtifacts<'a> {
    pub checkpoints: &'a CheckpointManager,
    pub metrics:     &'a MetricsLogger,
    pub variant:     &'a str,
}

/// Train `model` until `cfg.epochs` or early stopping.
///
/// Returns the weights of the final epoch together with the history;
/// the best weights are on disk under `artifacts.variant`.
pub fn fit<B, M>(
    mut model: M,
    train:     &dyn BatchSource<<M as Objective<B>>::Batch>,
    valid:     &dyn BatchSource<<M::InnerModule as Objective<B::InnerBackend>>::Batch>,
    cfg:       &FitConfig,
    artifacts: &RunArtifacts<'_>,
) -> CoreResult<(M, History)>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + Objective<B>,
    M::InnerModule: Objective<B::InnerBackend>,
{
    cfg.validate()?;

    let mut optim = AdamConfig::new()
        .with_grad_clipping(Some(GradientClippingConfig::Norm(cfg.grad_clip)))
        .init::<B, M>();

    let mut history = History::new();
    let mut stopper = if cfg.resumed {
        let baseline = evaluate::<B::InnerBackend, _>(&model.valid(), valid, "validation")?;
        tracing::info!("Resumed weights: val_loss={:.4}", baseline.loss);
        EarlyStopping::with_best(cfg.patience, baseline.loss)
    } else {
        EarlyStopping::new(cfg.patience)
    };

    for epoch in 1..=cfg.epochs {
        // ── Training phase ────────────────────────────────────────────────────
        let mut totals = PassTotals::default();
        for batch in train.batches() {
            let out  = model.objective(batch)?;
            let loss = out.loss.clone().into_scalar().elem::<f64>();
            if !loss.is_finite() {
                return Err(CoreError::TrainingDivergence { epoch, loss });
            }
            totals.add(loss, out.terms, out.examples, out.correct);

            let grads = out.loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.learning_rate, model, grads);
        }
        let train_eval = totals.finish("training")?;

        // ── Validation phase ──────────────────────────────────────────────────
        let model_valid = model.valid();
        let val_eval    = evaluate::<B::InnerBackend, _>(&model_valid, valid, "validation")?;
        if !val_eval.loss.is_finite() {
            return Err(CoreError::TrainingDivergence { epoch, loss: val_eval.loss });
        }

        // ── Record ────────────────────────────────────────────────────────────
        let record = EpochRecord {
            epoch,
            train_loss: train_eval.loss,
            val_loss:   val_eval.loss,
            train_acc:  train_eval.accuracy,
            val_acc:    val_eval.accuracy,
        };
        artifacts.metrics.log(&record)?;
        if epoch == 1 || epoch % cfg.print_every == 0 {
            tracing::info!("{}", epoch_line(&record, cfg.epochs));
        }
        history.push(record);

        // ── Checkpoint / early stop ───────────────────────────────────────────
        match stopper.observe(val_eval.loss) {
            Verdict::Improved { previous_best } => {
                artifacts.checkpoints.save_model::<B::InnerBackend, _>(artifacts.variant, &model_valid)?;
                tracing::debug!(
                    "Validation loss improved ({:.4} -> {:.4}), checkpoint saved",
                    previous_best, val_eval.loss,
                );
            }
            Verdict::NotImproved { best, waited } => {
                tracing::warn!(
                    "Validation loss not improving ({:.4} -> {:.4}), {}/{}",
                    best, val_eval.loss, waited, cfg.patience,
                );
            }
            Verdict::Stop { best, .. } => {
                tracing::warn!("Validation loss not improving ({:.4} -> {:.4})", best, val_eval.loss);
                tracing::info!("Early stopped at epoch {}", epoch);
                history.stop_reason = StopReason::EarlyStopped;
                break;
            }
        }
    }

    history.best_val_loss = stopper.best();
    tracing::info!(
        "Training finished after {} epochs, best val_loss={:.4}",
        history.epochs, history.best_val_loss,
    );
    Ok((model, history))
}

fn epoch_line(r: &EpochRecord, total: usize) -> String {
    let mut line = format!(
        "Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4}",
        r.epoch, total, r.train_loss, r.val_loss,
    );
    if let (Some(ta), Some(va)) = (r.train_acc, r.val_acc) {
        line.push_str(&format!(" | train_acc={:.1}% | val_acc={:.1}%", ta * 100.0, va * 100.0));
    }
    line
}
