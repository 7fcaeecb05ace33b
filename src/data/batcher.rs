// ============================================================
// Layer 4: Name Batcher
// ============================================================
// Implements Burn's Batcher trait to stack a Vec<NameSample>
// into tensors.
//
//   Input:  N NameSamples, each padded to length S
//   Output: NameBatch { inputs: [N, S], labels: [N] }
//
// All samples of a split share one length (see encoder::pad),
// so batching is a flatten followed by a reshape.
//
// `make_loader` wires dataset + batcher into a burn DataLoader.
// Training loaders shuffle with a fixed seed, reshuffling on
// every pass; validation and test loaders keep their order.

use std::sync::Arc;

use burn::{
    data::dataloader::{batcher::Batcher, DataLoader, DataLoaderBuilder},
    prelude::*,
};

use crate::data::dataset::{NameDataset, NameSample};
use crate::domain::traits::BatchSource;

// ─── NameBatch ────────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct NameBatch<B: Backend> {
    /// Token ids, shape [batch_size, seq_len]
    pub inputs: Tensor<B, 2, Int>,

    /// Class ids, shape [batch_size]; None for generation batches
    pub labels: Option<Tensor<B, 1, Int>>,
}

impl<B: Backend> NameBatch<B> {
    pub fn len(&self) -> usize {
        self.inputs.dims()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ─── NameBatcher ──────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct NameBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> NameBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<NameSample, NameBatch<B>> for NameBatcher<B> {
    fn batch(&self, items: Vec<NameSample>) -> NameBatch<B> {
        let batch_size = items.len();
        let seq_len    = items.first().map_or(0, |s| s.ids.len());

        let flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.ids.iter().map(|&x| x as i32))
            .collect();

        let inputs = Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device)
            .reshape([batch_size, seq_len]);

        // A batch is labelled only if every sample is
        let labels = items
            .iter()
            .map(|s| s.label.map(|l| l as i32))
            .collect::<Option<Vec<i32>>>()
            .filter(|_| batch_size > 0)
            .map(|l| Tensor::<B, 1, Int>::from_ints(l.as_slice(), &self.device));

        NameBatch { inputs, labels }
    }
}

/// Build a DataLoader over `samples`.
///
/// `shuffle_seed` is Some for training loaders only.
pub fn make_loader<B: Backend>(
    samples: Vec<NameSample>,
    batch_size: usize,
    shuffle_seed: Option<u64>,
    device: B::Device,
) -> Arc<dyn DataLoader<NameBatch<B>>> {
    let builder = DataLoaderBuilder::new(NameBatcher::<B>::new(device)).batch_size(batch_size);
    let builder = match shuffle_seed {
        Some(seed) => builder.shuffle(seed),
        None       => builder,
    };
    builder.build(NameDataset::new(samples))
}

impl<O: 'static> BatchSource<O> for Arc<dyn DataLoader<O>> {
    fn batches(&self) -> Box<dyn Iterator<Item = O> + '_> {
        Box::new(self.iter())
    }
}
