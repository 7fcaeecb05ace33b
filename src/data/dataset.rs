use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::data::encoder::{encode, pad, PadSide};
use crate::domain::error::CoreResult;
use crate::domain::labels::LabelSet;
use crate::domain::traits::RawExample;
use crate::domain::vocabulary::Vocabulary;

/// One encoded and padded name.
/// `label` is set for classification samples only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameSample {
    pub ids:   Vec<u32>,
    pub label: Option<usize>,
}

impl NameSample {
    /// Number of non-padding ids
    pub fn real_len(&self) -> usize {
        self.ids.iter().filter(|&&id| id != 0).count()
    }
}

/// Encode and pad a batch of raw examples into samples.
///
/// Labels are encoded through `labels` when given; examples with
/// a label but no label set keep `label: None`.
pub fn build_samples(
    examples: &[RawExample],
    vocab: &Vocabulary,
    labels: Option<&LabelSet>,
    length: Option<usize>,
    side: PadSide,
) -> CoreResult<Vec<NameSample>> {
    let texts: Vec<&str> = examples.iter().map(|e| e.text.as_str()).collect();
    let rows = pad(&encode(&texts, vocab)?, length, side);

    examples
        .iter()
        .zip(rows)
        .map(|(example, ids)| {
            let label = match (labels, &example.label) {
                (Some(set), Some(name)) => Some(set.encode(name)?),
                _ => None,
            };
            Ok(NameSample { ids, label })
        })
        .collect()
}

pub struct NameDataset {
    samples: Vec<NameSample>,
}

impl NameDataset {
    pub fn new(samples: Vec<NameSample>) -> Self { Self { samples } }
}

impl Dataset<NameSample> for NameDataset {
    fn get(&self, index: usize) -> Option<NameSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_share_one_length() {
        let vocab    = Vocabulary::build(&["Anna", "Bo"]);
        let examples = vec![RawExample::unlabelled("Anna"), RawExample::unlabelled("Bo")];
        let samples  = build_samples(&examples, &vocab, None, None, PadSide::End).unwrap();
        assert_eq!(samples.len(), 2);
        assert!(samples.iter().all(|s| s.ids.len() == 4));
        assert_eq!(samples[1].real_len(), 2);
        assert_eq!(samples[1].ids[2..], [0, 0]);
    }

    #[test]
    fn test_labels_are_encoded() {
        let vocab    = Vocabulary::build(&["Li", "Ng"]);
        let labels   = LabelSet::new(vec!["Chinese".into(), "Vietnamese".into()]);
        let examples = vec![
            RawExample::labelled("Li", "Chinese"),
            RawExample::labelled("Ng", "Vietnamese"),
        ];
        let samples = build_samples(&examples, &vocab, Some(&labels), Some(5), PadSide::Start).unwrap();
        assert_eq!(samples[0].label, Some(0));
        assert_eq!(samples[1].label, Some(1));
        assert_eq!(samples[0].ids[..3], [0, 0, 0]);
    }

    #[test]
    fn test_dataset_indexing() {
        let ds = NameDataset::new(vec![NameSample { ids: vec![1, 2], label: None }]);
        assert_eq!(ds.len(), 1);
        assert!(ds.get(0).is_some());
        assert!(ds.get(1).is_none());
    }
}
