// ============================================================
// Layer 5: Recurrent Cells
// ============================================================
// Three single-layer cells behind one RecurrentCell trait.
// Each cell owns two fused projections: one over the input,
// one over the previous hidden state. Their outputs hold every
// gate side by side and are sliced apart with `gate`.
//
//   RNN   h' = tanh(W x + U h)
//
//   LSTM  i, f, g, o = split(W x + U h)
//         c' = σ(f) * c + σ(i) * tanh(g)
//         h' = σ(o) * tanh(c')
//
//   GRU   r = σ(W_r x + U_r h)
//         z = σ(W_z x + U_z h)
//         n = tanh(W_n x + r * (U_n h))
//         h' = n + z * (h - n)
//
// RecurrentUnit holds exactly one of the three and runs it over
// a whole [batch, time, features] sequence. Hidden state goes
// in as a value and comes back as a new value; nothing is
// mutated in place.

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::{sigmoid, tanh},
};

use crate::domain::cell::CellKind;
use crate::domain::error::{CoreError, CoreResult};

// ─── HiddenState ──────────────────────────────────────────────────────────────
/// Recurrent state carried between time steps and between calls.
#[derive(Debug, Clone)]
pub struct HiddenState<B: Backend> {
    /// [batch, hidden]
    pub hidden: Tensor<B, 2>,
    /// [batch, hidden], LSTM only
    pub cell: Option<Tensor<B, 2>>,
}

impl<B: Backend> HiddenState<B> {
    pub fn batch_size(&self) -> usize {
        self.hidden.dims()[0]
    }
}

// ─── RecurrentCell ────────────────────────────────────────────────────────────
/// One recurrent step. Implemented by RnnCell, LstmCell and GruCell.
pub trait RecurrentCell<B: Backend> {
    /// Width of the hidden (and LSTM cell) state
    fn hidden_size(&self) -> usize;

    /// Zero state for `batch` sequences
    fn init_state(&self, batch: usize, device: &B::Device) -> HiddenState<B>;

    /// Consume one time step `x` of shape [batch, input]
    fn step(&self, x: Tensor<B, 2>, state: HiddenState<B>) -> HiddenState<B>;
}

/// Columns `index * width .. (index + 1) * width` of a fused projection
fn gate<B: Backend>(gates: &Tensor<B, 2>, index: usize, width: usize) -> Tensor<B, 2> {
    let [batch, _] = gates.dims();
    gates.clone().slice([0..batch, index * width..(index + 1) * width])
}

fn zeros<B: Backend>(batch: usize, hidden: usize, device: &B::Device) -> Tensor<B, 2> {
    Tensor::zeros([batch, hidden], device)
}

// ─── Simple RNN ───────────────────────────────────────────────────────────────
/// Elman cell: one tanh layer over input and previous hidden state.
#[derive(Module, Debug)]
pub struct RnnCell<B: Backend> {
    input:       Linear<B>,
    hidden:      Linear<B>,
    hidden_size: usize,
}

impl<B: Backend> RecurrentCell<B> for RnnCell<B> {
    fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    fn init_state(&self, batch: usize, device: &B::Device) -> HiddenState<B> {
        HiddenState { hidden: zeros(batch, self.hidden_size, device), cell: None }
    }

    fn step(&self, x: Tensor<B, 2>, state: HiddenState<B>) -> HiddenState<B> {
        let hidden = tanh(self.input.forward(x) + self.hidden.forward(state.hidden));
        HiddenState { hidden, cell: None }
    }
}

// ─── LSTM ─────────────────────────────────────────────────────────────────────
/// Long short-term memory cell; gate order in the fused
/// projections is input, forget, candidate, output.
#[derive(Module, Debug)]
pub struct LstmCell<B: Backend> {
    input:       Linear<B>,
    hidden:      Linear<B>,
    hidden_size: usize,
}

impl<B: Backend> RecurrentCell<B> for LstmCell<B> {
    fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    fn init_state(&self, batch: usize, device: &B::Device) -> HiddenState<B> {
        HiddenState {
            hidden: zeros(batch, self.hidden_size, device),
            cell:   Some(zeros(batch, self.hidden_size, device)),
        }
    }

    fn step(&self, x: Tensor<B, 2>, state: HiddenState<B>) -> HiddenState<B> {
        let h     = self.hidden_size;
        let cell  = state.cell.unwrap_or_else(|| state.hidden.zeros_like());
        let gates = self.input.forward(x) + self.hidden.forward(state.hidden);

        let i = sigmoid(gate(&gates, 0, h));
        let f = sigmoid(gate(&gates, 1, h));
        let g = tanh(gate(&gates, 2, h));
        let o = sigmoid(gate(&gates, 3, h));

        let cell   = f * cell + i * g;
        let hidden = o * tanh(cell.clone());
        HiddenState { hidden, cell: Some(cell) }
    }
}

// ─── GRU ──────────────────────────────────────────────────────────────────────
/// Gated recurrent unit; gate order is reset, update, candidate.
/// The reset gate scales the hidden projection of the candidate.
#[derive(Module, Debug)]
pub struct GruCell<B: Backend> {
    input:       Linear<B>,
    hidden:      Linear<B>,
    hidden_size: usize,
}

impl<B: Backend> RecurrentCell<B> for GruCell<B> {
    fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    fn init_state(&self, batch: usize, device: &B::Device) -> HiddenState<B> {
        HiddenState { hidden: zeros(batch, self.hidden_size, device), cell: None }
    }

    fn step(&self, x: Tensor<B, 2>, state: HiddenState<B>) -> HiddenState<B> {
        let h    = self.hidden_size;
        let prev = state.hidden;
        let xg   = self.input.forward(x);
        let hg   = self.hidden.forward(prev.clone());

        let r = sigmoid(gate(&xg, 0, h) + gate(&hg, 0, h));
        let z = sigmoid(gate(&xg, 1, h) + gate(&hg, 1, h));
        let n = tanh(gate(&xg, 2, h) + r * gate(&hg, 2, h));

        let hidden = n.clone() + z * (prev - n);
        HiddenState { hidden, cell: None }
    }
}

// ─── RecurrentUnit ────────────────────────────────────────────────────────────
/// Configuration to create a [RecurrentUnit] with one cell of `kind`.
#[derive(Config, Debug)]
pub struct RecurrentUnitConfig {
    /// Which cell the unit runs
    pub kind:        CellKind,
    /// Features per time step (embedding size)
    pub input_size:  usize,
    /// Width of the hidden state
    pub hidden_size: usize,
}

impl RecurrentUnitConfig {
    /// Build the unit with freshly initialised weights on `device`.
    pub fn init<B: Backend>(&self, device: &B::Device) -> RecurrentUnit<B> {
        let width  = self.hidden_size * self.kind.gate_count();
        let input  = LinearConfig::new(self.input_size, width).init(device);
        let hidden = LinearConfig::new(self.hidden_size, width).init(device);
        let h      = self.hidden_size;

        let mut unit = RecurrentUnit { rnn: None, lstm: None, gru: None };
        match self.kind {
            CellKind::Rnn  => unit.rnn  = Some(RnnCell  { input, hidden, hidden_size: h }),
            CellKind::Lstm => unit.lstm = Some(LstmCell { input, hidden, hidden_size: h }),
            CellKind::Gru  => unit.gru  = Some(GruCell  { input, hidden, hidden_size: h }),
        }
        unit
    }
}

/// Runs one recurrent cell over whole sequences.
///
/// The generator and classifier hold a RecurrentUnit instead of
/// a concrete cell, so the cell kind is a runtime choice and the
/// embedding/projection wiring exists once. Exactly one of the
/// slots is filled, chosen by RecurrentUnitConfig.
#[derive(Module, Debug)]
pub struct RecurrentUnit<B: Backend> {
    rnn:  Option<RnnCell<B>>,
    lstm: Option<LstmCell<B>>,
    gru:  Option<GruCell<B>>,
}

impl<B: Backend> RecurrentUnit<B> {
    /// The cell this unit holds; an error if the slots were tampered with
    pub fn kind(&self) -> CoreResult<CellKind> {
        match (&self.rnn, &self.lstm, &self.gru) {
            (Some(_), None, None) => Ok(CellKind::Rnn),
            (None, Some(_), None) => Ok(CellKind::Lstm),
            (None, None, Some(_)) => Ok(CellKind::Gru),
            _ => Err(CoreError::Checkpoint(
                "recurrent unit must hold exactly one cell".to_string(),
            )),
        }
    }

    fn cell(&self) -> CoreResult<&dyn RecurrentCell<B>> {
        Ok(match self.kind()? {
            CellKind::Rnn  => self.rnn.as_ref().map(|c| c as &dyn RecurrentCell<B>),
            CellKind::Lstm => self.lstm.as_ref().map(|c| c as &dyn RecurrentCell<B>),
            CellKind::Gru  => self.gru.as_ref().map(|c| c as &dyn RecurrentCell<B>),
        }
        .ok_or_else(|| CoreError::Checkpoint("recurrent cell slot is empty".to_string()))?)
    }

    pub fn hidden_size(&self) -> CoreResult<usize> {
        Ok(self.cell()?.hidden_size())
    }

    pub fn init_state(&self, batch: usize, device: &B::Device) -> CoreResult<HiddenState<B>> {
        Ok(self.cell()?.init_state(batch, device))
    }

    /// Reject a carried state that does not fit this unit and batch.
    pub fn check_state(&self, state: &HiddenState<B>, batch: usize) -> CoreResult<()> {
        let expected = vec![batch, self.hidden_size()?];
        let actual   = state.hidden.dims().to_vec();
        if actual != expected {
            return Err(CoreError::Shape { expected, actual });
        }
        match (self.kind()?, &state.cell) {
            (CellKind::Lstm, Some(cell)) if cell.dims().to_vec() != expected => Err(CoreError::Shape {
                expected,
                actual: cell.dims().to_vec(),
            }),
            (CellKind::Lstm, None) => Err(CoreError::Shape { expected, actual: Vec::new() }),
            _ => Ok(()),
        }
    }

    /// Run the cell over every step of `inputs` [batch, time, features].
    ///
    /// Returns the hidden output of each step, [batch, time, hidden],
    /// and the state after the last step.
    pub fn forward(
        &self,
        inputs: Tensor<B, 3>,
        state: Option<HiddenState<B>>,
    ) -> CoreResult<(Tensor<B, 3>, HiddenState<B>)> {
        let [batch, steps, features] = inputs.dims();
        if steps == 0 {
            return Err(CoreError::EmptySequence);
        }

        let cell = self.cell()?;
        let mut state = match state {
            Some(state) => {
                self.check_state(&state, batch)?;
                state
            }
            None => cell.init_state(batch, &inputs.device()),
        };

        let mut outputs = Vec::with_capacity(steps);
        for t in 0..steps {
            let x = inputs
                .clone()
                .slice([0..batch, t..t + 1, 0..features])
                .reshape([batch, features]);
            state = cell.step(x, state);
            outputs.push(state.hidden.clone().unsqueeze_dim::<3>(1));
        }

        Ok((Tensor::cat(outputs, 1), state))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn unit(kind: CellKind) -> RecurrentUnit<TestBackend> {
        RecurrentUnitConfig::new(kind, 5, 8).init(&Default::default())
    }

    #[test]
    fn test_output_shapes_for_every_cell() {
        let device = Default::default();
        for kind in [CellKind::Rnn, CellKind::Lstm, CellKind::Gru] {
            let unit   = unit(kind);
            let inputs = Tensor::<TestBackend, 3>::ones([2, 4, 5], &device);
            let (out, state) = unit.forward(inputs, None).unwrap();
            assert_eq!(out.dims(), [2, 4, 8]);
            assert_eq!(state.hidden.dims(), [2, 8]);
            assert_eq!(state.cell.is_some(), kind == CellKind::Lstm);
            assert_eq!(unit.kind().unwrap(), kind);
        }
    }

    #[test]
    fn test_last_output_equals_final_hidden() {
        let device = Default::default();
        let unit   = unit(CellKind::Gru);
        let inputs = Tensor::<TestBackend, 3>::random([1, 3, 5], burn::tensor::Distribution::Default, &device);
        let (out, state) = unit.forward(inputs, None).unwrap();
        let last: Vec<f32> = out.slice([0..1, 2..3, 0..8]).into_data().iter::<f32>().collect();
        let fin:  Vec<f32> = state.hidden.into_data().iter::<f32>().collect();
        assert_eq!(last, fin);
    }

    #[test]
    fn test_carried_state_matches_single_pass() {
        let device = Default::default();
        let unit   = unit(CellKind::Lstm);
        let inputs = Tensor::<TestBackend, 3>::random([1, 4, 5], burn::tensor::Distribution::Default, &device);

        let (_, whole) = unit.forward(inputs.clone(), None).unwrap();
        let (_, half)  = unit.forward(inputs.clone().slice([0..1, 0..2, 0..5]), None).unwrap();
        let (_, rest)  = unit.forward(inputs.slice([0..1, 2..4, 0..5]), Some(half)).unwrap();

        let a: Vec<f32> = whole.hidden.into_data().iter::<f32>().collect();
        let b: Vec<f32> = rest.hidden.into_data().iter::<f32>().collect();
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-5);
        }
    }

    #[test]
    fn test_empty_sequence_is_an_error() {
        let inputs = Tensor::<TestBackend, 3>::zeros([1, 0, 5], &Default::default());
        assert!(matches!(unit(CellKind::Rnn).forward(inputs, None), Err(CoreError::EmptySequence)));
    }

    #[test]
    fn test_mismatched_state_is_shape_error() {
        let device = Default::default();
        let rnn    = unit(CellKind::Rnn);
        let inputs = Tensor::<TestBackend, 3>::zeros([2, 1, 5], &device);
        let wrong  = HiddenState { hidden: Tensor::zeros([3, 8], &device), cell: None };
        assert!(matches!(rnn.forward(inputs.clone(), Some(wrong)), Err(CoreError::Shape { .. })));

        let lstm    = unit(CellKind::Lstm);
        let no_cell = HiddenState { hidden: Tensor::zeros([2, 8], &device), cell: None };
        assert!(matches!(lstm.forward(inputs, Some(no_cell)), Err(CoreError::Shape { .. })));
    }
}
