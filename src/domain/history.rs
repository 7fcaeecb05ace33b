// ============================================================
// Layer 3: Training History and Early Stopping
// ============================================================
// History is the append-only per-epoch record the training
// loop hands to reporting collaborators (metrics CSV, plots).
//
// EarlyStopping is the checkpoint/patience state machine,
// kept free of tensors so its policy is testable on its own:
//
//   val_loss <= best  -> Improved   (write checkpoint, counter = 0)
//   val_loss >  best  -> counter += 1
//   counter == patience -> Stop
//
// Ties count as improvement.

use serde::{Deserialize, Serialize};

/// Metrics of one completed epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochRecord {
    /// Epoch number, starting at 1
    pub epoch: usize,
    pub train_loss: f64,
    pub val_loss: f64,
    /// Only classifiers report accuracy
    pub train_acc: Option<f64>,
    pub val_acc: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    MaxEpochs,
    EarlyStopped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct History {
    pub records: Vec<EpochRecord>,
    /// Number of epochs actually executed
    pub epochs: usize,
    pub stop_reason: StopReason,
    pub best_val_loss: f64,
}

impl History {
    pub fn new() -> Self {
        Self {
            records:       Vec::new(),
            epochs:        0,
            stop_reason:   StopReason::MaxEpochs,
            best_val_loss: f64::INFINITY,
        }
    }

    pub fn push(&mut self, record: EpochRecord) {
        self.epochs = record.epoch;
        self.records.push(record);
    }

    pub fn train_losses(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.train_loss).collect()
    }

    pub fn val_losses(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.val_loss).collect()
    }

    pub fn last(&self) -> Option<&EpochRecord> {
        self.records.last()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

/// What the loop should do after observing one validation loss
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    /// New best (or tie): persist the weights
    Improved { previous_best: f64 },
    /// No improvement; `waited` consecutive epochs so far
    NotImproved { best: f64, waited: usize },
    /// Patience exhausted: terminate after this epoch
    Stop { best: f64, waited: usize },
}

#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience: usize,
    best: f64,
    waited: usize,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> Self {
        Self { patience, best: f64::INFINITY, waited: 0 }
    }

    /// Start from a known best loss, e.g. the validation loss of
    /// resumed weights. Only a loss <= `best` counts as improvement.
    pub fn with_best(patience: usize, best: f64) -> Self {
        let best = if best.is_finite() { best } else { f64::INFINITY };
        Self { patience, best, waited: 0 }
    }

    pub fn observe(&mut self, val_loss: f64) -> Verdict {
        if val_loss <= self.best {
            let previous_best = self.best;
            self.best   = val_loss;
            self.waited = 0;
            return Verdict::Improved { previous_best };
        }

        self.waited += 1;
        if self.waited >= self.patience {
            Verdict::Stop { best: self.best, waited: self.waited }
        } else {
            Verdict::NotImproved { best: self.best, waited: self.waited }
        }
    }

    pub fn best(&self) -> f64 {
        self.best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ties_count_as_improvement() {
        let mut es = EarlyStopping::new(2);
        assert!(matches!(es.observe(1.0), Verdict::Improved { .. }));
        assert!(matches!(es.observe(1.0), Verdict::Improved { previous_best } if previous_best == 1.0));
    }

    #[test]
    fn test_counter_increases_by_one_per_bad_epoch() {
        let mut es = EarlyStopping::new(3);
        es.observe(1.0);
        assert_eq!(es.observe(1.5), Verdict::NotImproved { best: 1.0, waited: 1 });
        assert_eq!(es.observe(1.2), Verdict::NotImproved { best: 1.0, waited: 2 });
        assert_eq!(es.observe(1.1), Verdict::Stop { best: 1.0, waited: 3 });
    }

    #[test]
    fn test_improvement_resets_counter() {
        let mut es = EarlyStopping::new(2);
        es.observe(1.0);
        es.observe(2.0);
        assert!(matches!(es.observe(0.5), Verdict::Improved { .. }));
        assert_eq!(es.observe(0.6), Verdict::NotImproved { best: 0.5, waited: 1 });
        assert_eq!(es.best(), 0.5);
    }

    #[test]
    fn test_seeded_best_rejects_worse_first_epoch() {
        let mut es = EarlyStopping::with_best(2, 0.5);
        assert_eq!(es.observe(0.7), Verdict::NotImproved { best: 0.5, waited: 1 });
        assert!(matches!(es.observe(0.5), Verdict::Improved { previous_best } if previous_best == 0.5));

        let nan = EarlyStopping::with_best(2, f64::NAN);
        assert_eq!(nan.best(), f64::INFINITY);
    }

    #[test]
    fn test_history_tracks_epoch_count() {
        let mut h = History::new();
        for epoch in 1..=3 {
            h.push(EpochRecord { epoch, train_loss: 1.0, val_loss: 2.0, train_acc: None, val_acc: None });
        }
        assert_eq!(h.epochs, 3);
        assert_eq!(h.val_losses(), vec![2.0, 2.0, 2.0]);
    }
}
