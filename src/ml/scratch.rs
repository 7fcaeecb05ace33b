// ============================================================
// Layer 5: One-Hot RNN (no library cell)
// ============================================================
// The smallest recurrent classifier: each step concatenates
// the one-hot letter with the previous hidden state and feeds
// the result through two linear layers.
//
//   combined = [x_t, h_{t-1}]            [1, 55 + hidden]
//   h_t      = W_h · combined            [1, hidden]
//   y_t      = log_softmax(W_o · combined)  [1, labels]
//
// Only y after the last letter is used. The loss is the
// negative log-likelihood of the target label under y.

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::log_softmax,
};

use crate::data::onehot::OneHotExample;
use crate::domain::error::{CoreError, CoreResult};
use crate::ml::trainer::{Objective, StepOutput};

#[derive(Config, Debug)]
pub struct OneHotRnnConfig {
    pub input_size:  usize,
    pub num_labels:  usize,
    #[config(default = 128)]
    pub hidden_size: usize,
}

impl OneHotRnnConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> OneHotRnn<B> {
        let combined = self.input_size + self.hidden_size;
        OneHotRnn {
            to_hidden:   LinearConfig::new(combined, self.hidden_size).init(device),
            to_output:   LinearConfig::new(combined, self.num_labels).init(device),
            input_size:  self.input_size,
            hidden_size: self.hidden_size,
            num_labels:  self.num_labels,
        }
    }
}

#[derive(Module, Debug)]
pub struct OneHotRnn<B: Backend> {
    pub to_hidden:   Linear<B>,
    pub to_output:   Linear<B>,
    pub input_size:  usize,
    pub hidden_size: usize,
    pub num_labels:  usize,
}

impl<B: Backend> OneHotRnn<B> {
    pub fn init_hidden(&self, device: &B::Device) -> Tensor<B, 2> {
        Tensor::zeros([1, self.hidden_size], device)
    }

    /// One letter: ([1, input], [1, hidden]) → (log-probs [1, labels], hidden)
    pub fn step(&self, input: Tensor<B, 2>, hidden: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let combined = Tensor::cat(vec![input, hidden], 1);
        let hidden   = self.to_hidden.forward(combined.clone());
        let output   = log_softmax(self.to_output.forward(combined), 1);
        (output, hidden)
    }

    /// Consume every row of `letters` [len, input]; log-probs after the last.
    pub fn forward(&self, letters: Tensor<B, 2>) -> CoreResult<Tensor<B, 2>> {
        let [len, width] = letters.dims();
        if len == 0 {
            return Err(CoreError::EmptySequence);
        }
        if width != self.input_size {
            return Err(CoreError::Shape { expected: vec![len, self.input_size], actual: vec![len, width] });
        }

        let mut hidden = self.init_hidden(&letters.device());
        let mut output = None;
        for t in 0..len {
            let row = letters.clone().slice([t..t + 1, 0..width]);
            let (out, next) = self.step(row, hidden);
            hidden = next;
            output = Some(out);
        }
        output.ok_or(CoreError::EmptySequence)
    }
}

impl<B: Backend> Objective<B> for OneHotRnn<B> {
    type Batch = OneHotExample<B>;

    fn objective(&self, example: OneHotExample<B>) -> CoreResult<StepOutput<B>> {
        let label = example.label;
        if label >= self.num_labels {
            return Err(CoreError::UnknownId { id: label });
        }
        let log_probs = self.forward(example.input)?;

        let predicted = log_probs.clone().argmax(1).into_scalar().elem::<i64>();
        let loss = log_probs.slice([0..1, label..label + 1]).neg().reshape([1]);

        Ok(StepOutput {
            loss,
            terms:    1,
            examples: 1,
            correct:  Some(usize::from(predicted as usize == label)),
        })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    use crate::data::onehot::{line_to_tensor, N_LETTERS};

    type TestBackend = NdArray;

    fn model() -> OneHotRnn<TestBackend> {
        OneHotRnnConfig::new(N_LETTERS, 4).with_hidden_size(16).init(&Default::default())
    }

    #[test]
    fn test_output_is_a_distribution() {
        let input = line_to_tensor::<TestBackend>("Abbas", &Default::default()).unwrap();
        let out   = model().forward(input).unwrap();
        assert_eq!(out.dims(), [1, 4]);
        let total: f32 = out.exp().into_data().iter::<f32>().sum();
        assert!((total - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_hidden_starts_at_zero() {
        let h = model().init_hidden(&Default::default());
        assert_eq!(h.dims(), [1, 16]);
        assert!(h.into_data().iter::<f32>().all(|v| v == 0.0));
    }

    #[test]
    fn test_nll_matches_selected_log_prob() {
        let m     = model();
        let input = line_to_tensor::<TestBackend>("Li", &Default::default()).unwrap();
        let log_probs: Vec<f32> = m.forward(input.clone()).unwrap().into_data().iter::<f32>().collect();

        let out  = m.objective(OneHotExample { input, label: 2 }).unwrap();
        let loss = out.loss.into_scalar().elem::<f32>();
        assert!((loss + log_probs[2]).abs() < 1e-6);
        assert_eq!(out.terms, 1);
    }

    #[test]
    fn test_wrong_width_is_shape_error() {
        let input = Tensor::<TestBackend, 2>::zeros([3, 10], &Default::default());
        assert!(matches!(model().forward(input), Err(CoreError::Shape { .. })));
    }

    #[test]
    fn test_label_out_of_range() {
        let input = line_to_tensor::<TestBackend>("Li", &Default::default()).unwrap();
        let err   = model().objective(OneHotExample { input, label: 9 });
        assert!(matches!(err, Err(CoreError::UnknownId { id: 9 })));
    }
}
