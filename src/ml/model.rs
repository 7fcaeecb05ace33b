use burn::{
    nn::{
        loss::CrossEntropyLossConfig,
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        Linear, LinearConfig,
    },
    prelude::*,
};

use crate::data::batcher::NameBatch;
use crate::domain::cell::CellKind;
use crate::domain::error::{CoreError, CoreResult};
use crate::ml::cell::{HiddenState, RecurrentUnit, RecurrentUnitConfig};
use crate::ml::trainer::{Objective, StepOutput};

// ─── Shared base ──────────────────────────────────────────────────────────────
// Embedding lookup followed by the recurrent unit. Both the
// generator and the classifier are built on top of it and only
// differ in what they do with the per-step outputs.
#[derive(Module, Debug)]
pub struct SequenceEncoder<B: Backend> {
    pub embedding: Embedding<B>,
    pub unit:      RecurrentUnit<B>,
}

impl<B: Backend> SequenceEncoder<B> {
    fn new(kind: CellKind, vocab_size: usize, embedding_size: usize, hidden_size: usize, device: &B::Device) -> Self {
        Self {
            embedding: EmbeddingConfig::new(vocab_size, embedding_size).init(device),
            unit:      RecurrentUnitConfig::new(kind, embedding_size, hidden_size).init(device),
        }
    }

    /// input_ids: [batch, seq] → outputs [batch, seq, hidden], final state
    pub fn forward(
        &self,
        input_ids: Tensor<B, 2, Int>,
        state: Option<HiddenState<B>>,
    ) -> CoreResult<(Tensor<B, 3>, HiddenState<B>)> {
        let embedded = self.embedding.forward(input_ids);
        self.unit.forward(embedded, state)
    }
}

// ─── Generator ────────────────────────────────────────────────────────────────
// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct CharRnnConfig {
    pub kind:           CellKind,
    pub vocab_size:     usize,
    #[config(default = 64)]
    pub embedding_size: usize,
    #[config(default = 128)]
    pub hidden_size:    usize,
    #[config(default = 0.2)]
    pub dropout:        f64,
}

impl CharRnnConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> CharRnn<B> {
        CharRnn {
            encoder:    SequenceEncoder::new(self.kind, self.vocab_size, self.embedding_size, self.hidden_size, device),
            dropout:    DropoutConfig::new(self.dropout).init(),
            output:     LinearConfig::new(self.hidden_size, self.vocab_size).init(device),
            vocab_size: self.vocab_size,
        }
    }
}

#[derive(Module, Debug)]
pub struct CharRnn<B: Backend> {
    pub encoder:    SequenceEncoder<B>,
    pub dropout:    Dropout,
    pub output:     Linear<B>,
    pub vocab_size: usize,
}

impl<B: Backend> CharRnn<B> {
    /// input_ids: [batch, seq] → logits [batch, seq, vocab], new state.
    ///
    /// Pass the returned state back in to continue the same sequences.
    pub fn forward(
        &self,
        input_ids: Tensor<B, 2, Int>,
        state: Option<HiddenState<B>>,
    ) -> CoreResult<(Tensor<B, 3>, HiddenState<B>)> {
        let (outputs, state) = self.encoder.forward(input_ids, state)?;
        let logits = self.output.forward(self.dropout.forward(outputs));
        Ok((logits, state))
    }

    pub fn init_state(&self, batch: usize, device: &B::Device) -> CoreResult<HiddenState<B>> {
        self.encoder.unit.init_state(batch, device)
    }

    /// Cross-entropy of predicting step t+1 from steps 0..=t.
    ///
    /// Returns the mean loss and the number of predicted positions.
    pub fn next_char_loss(&self, input_ids: Tensor<B, 2, Int>) -> CoreResult<(Tensor<B, 1>, usize)> {
        let [batch, seq] = input_ids.dims();
        if seq < 2 {
            return Err(CoreError::EmptySequence);
        }
        let (logits, _) = self.forward(input_ids.clone(), None)?;

        let terms   = batch * (seq - 1);
        let predict = logits
            .slice([0..batch, 0..seq - 1, 0..self.vocab_size])
            .reshape([terms, self.vocab_size]);
        let targets = input_ids.slice([0..batch, 1..seq]).reshape([terms]);

        let loss = CrossEntropyLossConfig::new()
            .init(&predict.device())
            .forward(predict, targets);
        Ok((loss, terms))
    }
}

impl<B: Backend> Objective<B> for CharRnn<B> {
    type Batch = NameBatch<B>;

    fn objective(&self, batch: NameBatch<B>) -> CoreResult<StepOutput<B>> {
        let examples      = batch.len();
        let (loss, terms) = self.next_char_loss(batch.inputs)?;
        Ok(StepOutput { loss, terms, examples, correct: None })
    }
}

// ─── Classifier ───────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct NameClassifierConfig {
    pub kind:           CellKind,
    pub vocab_size:     usize,
    pub num_labels:     usize,
    #[config(default = 64)]
    pub embedding_size: usize,
    #[config(default = 128)]
    pub hidden_size:    usize,
}

impl NameClassifierConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> NameClassifier<B> {
        NameClassifier {
            encoder: SequenceEncoder::new(self.kind, self.vocab_size, self.embedding_size, self.hidden_size, device),
            output:  LinearConfig::new(self.hidden_size, self.num_labels).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct NameClassifier<B: Backend> {
    pub encoder: SequenceEncoder<B>,
    pub output:  Linear<B>,
}

impl<B: Backend> NameClassifier<B> {
    /// input_ids: [batch, seq] → label logits [batch, labels]
    ///
    /// Only the last time step is projected, which is why
    /// classification inputs are padded at the start.
    pub fn forward(&self, input_ids: Tensor<B, 2, Int>) -> CoreResult<Tensor<B, 2>> {
        let (outputs, _) = self.encoder.forward(input_ids, None)?;
        let [batch, seq, hidden] = outputs.dims();
        let last = outputs
            .slice([0..batch, seq - 1..seq, 0..hidden])
            .reshape([batch, hidden]);
        Ok(self.output.forward(last))
    }
}

impl<B: Backend> Objective<B> for NameClassifier<B> {
    type Batch = NameBatch<B>;

    fn objective(&self, batch: NameBatch<B>) -> CoreResult<StepOutput<B>> {
        let examples = batch.len();
        let targets  = batch.labels.ok_or_else(|| {
            CoreError::InvalidConfig("classification batch carries no labels".to_string())
        })?;
        let logits = self.forward(batch.inputs)?;

        let predicted = logits.clone().argmax(1).reshape([examples]);
        let correct: i64 = predicted
            .equal(targets.clone())
            .int()
            .sum()
            .into_scalar()
            .elem::<i64>();

        let loss = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits, targets);

        Ok(StepOutput { loss, terms: examples, examples, correct: Some(correct as usize) })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::module::Param;

    type TestBackend = NdArray;

    fn ids(rows: &[&[i32]]) -> Tensor<TestBackend, 2, Int> {
        let batch = rows.len();
        let seq   = rows[0].len();
        let flat: Vec<i32> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Tensor::<TestBackend, 1, Int>::from_ints(flat.as_slice(), &Default::default()).reshape([batch, seq])
    }

    #[test]
    fn test_generator_logits_cover_vocab() {
        let device = Default::default();
        for kind in [CellKind::Rnn, CellKind::Lstm, CellKind::Gru] {
            let model = CharRnnConfig::new(kind, 10)
                .with_embedding_size(4)
                .with_hidden_size(6)
                .init::<TestBackend>(&device);
            let (logits, state) = model.forward(ids(&[&[1, 2, 3], &[4, 5, 0]]), None).unwrap();
            assert_eq!(logits.dims(), [2, 3, 10]);
            assert_eq!(state.hidden.dims(), [2, 6]);
        }
    }

    #[test]
    fn test_next_char_loss_counts_shifted_positions() {
        let model = CharRnnConfig::new(CellKind::Gru, 8)
            .with_embedding_size(4)
            .with_hidden_size(5)
            .init::<TestBackend>(&Default::default());
        let (loss, terms) = model.next_char_loss(ids(&[&[1, 2, 3, 4], &[5, 6, 0, 0]])).unwrap();
        assert_eq!(terms, 6);
        let value = loss.into_scalar().elem::<f64>();
        assert!(value.is_finite() && value > 0.0);
    }

    #[test]
    fn test_single_step_has_nothing_to_predict() {
        let model = CharRnnConfig::new(CellKind::Rnn, 5).init::<TestBackend>(&Default::default());
        assert!(matches!(model.next_char_loss(ids(&[&[1]])), Err(CoreError::EmptySequence)));
    }

    #[test]
    fn test_classifier_projects_last_step() {
        let device = Default::default();
        for kind in [CellKind::Rnn, CellKind::Lstm, CellKind::Gru] {
            let model = NameClassifierConfig::new(kind, 12, 3)
                .with_embedding_size(4)
                .with_hidden_size(6)
                .init::<TestBackend>(&device);
            let logits = model.forward(ids(&[&[0, 0, 1, 2], &[3, 4, 5, 6]])).unwrap();
            assert_eq!(logits.dims(), [2, 3]);
        }
    }

    /// A classifier whose output layer ignores the recurrent state
    /// and always scores label 1 highest.
    fn always_label_one() -> NameClassifier<TestBackend> {
        let device = Default::default();
        let mut model = NameClassifierConfig::new(CellKind::Lstm, 6, 3)
            .with_embedding_size(4)
            .with_hidden_size(5)
            .init::<TestBackend>(&device);
        model.output.weight = Param::from_tensor(Tensor::zeros([5, 3], &device));
        model.output.bias   = Some(Param::from_tensor(Tensor::from_floats([0.0, 4.0, 1.0], &device)));
        model
    }

    #[test]
    fn test_classifier_objective_counts_correct() {
        let model = always_label_one();
        let batch = |targets: [i32; 3]| NameBatch {
            inputs: ids(&[&[0, 1, 2], &[3, 4, 5], &[1, 1, 1]]),
            labels: Some(Tensor::from_ints(targets, &Default::default())),
        };

        let mixed = model.objective(batch([1, 0, 2])).unwrap();
        assert_eq!(mixed.terms, 3);
        assert_eq!(mixed.correct, Some(1));

        assert_eq!(model.objective(batch([1, 1, 1])).unwrap().correct, Some(3));
        assert_eq!(model.objective(batch([0, 2, 0])).unwrap().correct, Some(0));
    }
}
