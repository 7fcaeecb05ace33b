// ============================================================
// Layer 5: Inferencer
// ============================================================
// Classification of single names with a loaded model.
//
//   Classifier        embedding classifier; the name is padded
//                     at the start to a fixed length (20 unless
//                     configured otherwise) like the training
//                     batches were
//
//   OneHotClassifier  one-hot RNN; the name is ASCII-folded
//                     first, then fed letter by letter
//
// Both return the raw score vector together with the argmax.

use burn::prelude::*;
use serde::Serialize;

use crate::data::encoder::{encode_one, pad, PadSide};
use crate::data::onehot::line_to_tensor;
use crate::data::preprocessor::fold_to_ascii_letters;
use crate::domain::error::{CoreError, CoreResult};
use crate::domain::labels::LabelSet;
use crate::domain::vocabulary::Vocabulary;
use crate::ml::model::NameClassifier;
use crate::ml::scratch::OneHotRnn;

/// Sequence length names are padded to at inference time
pub const INFERENCE_PAD_LENGTH: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub label_id: usize,
    pub label:    String,
    /// One score per label, in label-id order
    pub scores:   Vec<f32>,
}

fn to_prediction(scores: Vec<f32>, labels: &LabelSet) -> CoreResult<Prediction> {
    let label_id = argmax(&scores).ok_or(CoreError::EmptySequence)?;
    let label    = labels.decode(label_id)?.to_string();
    Ok(Prediction { label_id, label, scores })
}

/// Index of the largest score; the first one wins a tie.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    scores
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, &s)| match best {
            Some((_, b)) if b >= s => best,
            _ => Some((i, s)),
        })
        .map(|(i, _)| i)
}

// ─── Classifier ───────────────────────────────────────────────────────────────
pub struct Classifier<B: Backend> {
    model:      NameClassifier<B>,
    vocab:      Vocabulary,
    labels:     LabelSet,
    pad_length: usize,
    device:     B::Device,
}

impl<B: Backend> Classifier<B> {
    pub fn new(
        model:      NameClassifier<B>,
        vocab:      Vocabulary,
        labels:     LabelSet,
        pad_length: usize,
        device:     B::Device,
    ) -> Self {
        Self { model, vocab, labels, pad_length, device }
    }

    pub fn predict(&self, name: &str) -> CoreResult<Prediction> {
        let ids = encode_one(name, &self.vocab)?;
        if ids.is_empty() {
            return Err(CoreError::EmptySequence);
        }
        let row = pad(&[ids], Some(self.pad_length), PadSide::Start).concat();

        let flat: Vec<i32> = row.iter().map(|&id| id as i32).collect();
        let input = Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device)
            .reshape([1, flat.len()]);

        let logits = self.model.forward(input)?;
        let scores: Vec<f32> = logits.into_data().iter::<f32>().collect();
        tracing::debug!("{} -> {:?}", name, scores);
        to_prediction(scores, &self.labels)
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }
}

// ─── OneHotClassifier ─────────────────────────────────────────────────────────
pub struct OneHotClassifier<B: Backend> {
    model:  OneHotRnn<B>,
    labels: LabelSet,
    device: B::Device,
}

impl<B: Backend> OneHotClassifier<B> {
    pub fn new(model: OneHotRnn<B>, labels: LabelSet, device: B::Device) -> Self {
        Self { model, labels, device }
    }

    pub fn predict(&self, name: &str) -> CoreResult<Prediction> {
        let folded = fold_to_ascii_letters(name)?;
        let input  = line_to_tensor::<B>(&folded, &self.device)?;
        let scores: Vec<f32> = self.model.forward(input)?.into_data().iter::<f32>().collect();
        to_prediction(scores, &self.labels)
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    use crate::data::onehot::N_LETTERS;
    use crate::domain::cell::CellKind;
    use crate::ml::model::NameClassifierConfig;
    use crate::ml::scratch::OneHotRnnConfig;

    type TestBackend = NdArray;

    fn labels() -> LabelSet {
        LabelSet::new(vec!["Czech".into(), "Irish".into(), "Polish".into()])
    }

    #[test]
    fn test_argmax_prefers_first_maximum() {
        assert_eq!(argmax(&[0.1, 0.7, 0.7]), Some(1));
        assert_eq!(argmax(&[-3.0]), Some(0));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_prediction_has_one_score_per_label() {
        let vocab = Vocabulary::build(&["Novak", "Kelly"]);
        let model = NameClassifierConfig::new(CellKind::Gru, vocab.size(), 3)
            .with_embedding_size(4)
            .with_hidden_size(6)
            .init::<TestBackend>(&Default::default());
        let classifier = Classifier::new(model, vocab, labels(), INFERENCE_PAD_LENGTH, Default::default());

        let p = classifier.predict("Kelly").unwrap();
        assert_eq!(p.scores.len(), 3);
        assert_eq!(labels().decode(p.label_id).unwrap(), p.label);
        assert_eq!(Some(p.label_id), argmax(&p.scores));
    }

    #[test]
    fn test_unseen_character_is_unknown_symbol() {
        let vocab = Vocabulary::build(&["ab"]);
        let model = NameClassifierConfig::new(CellKind::Rnn, vocab.size(), 3).init::<TestBackend>(&Default::default());
        let classifier = Classifier::new(model, vocab, labels(), 5, Default::default());
        assert!(matches!(classifier.predict("abz"), Err(CoreError::UnknownSymbol { symbol: 'z' })));
        assert!(matches!(classifier.predict(""), Err(CoreError::EmptySequence)));
    }

    #[test]
    fn test_one_hot_classifier_folds_accents() {
        let model = OneHotRnnConfig::new(N_LETTERS, 3).with_hidden_size(8).init::<TestBackend>(&Default::default());
        let classifier = OneHotClassifier::new(model, labels(), Default::default());
        let plain  = classifier.predict("Dvorak").unwrap();
        let accent = classifier.predict("Dvořák").unwrap();
        assert_eq!(plain, accent);
        assert!(matches!(classifier.predict("Иван"), Err(CoreError::EmptySequence)));
    }
}
