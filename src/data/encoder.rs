// ============================================================
// Layer 4: Sequence Encoder
// ============================================================
// Maps names to id sequences and back, and pads a ragged list
// of sequences into a rectangle the batcher can reshape.
//
// Two padding conventions, fixed per task:
//
//   PadSide::End    "Ann" -> [A n n 0 0]   generation
//   PadSide::Start  "Ann" -> [0 0 A n n]   classification
//
// With PadSide::Start the last time step always holds the
// last real character, which is the step the classifier reads.
// Sequences longer than the target length lose their tail.

use crate::domain::error::CoreResult;
use crate::domain::vocabulary::{Vocabulary, PAD_ID};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PadSide {
    /// Left-aligned, zeros after the symbols
    #[default]
    End,
    /// Right-aligned, zeros before the symbols
    Start,
}

/// Encode every string, failing on the first unknown character.
pub fn encode<S: AsRef<str>>(strings: &[S], vocab: &Vocabulary) -> CoreResult<Vec<Vec<u32>>> {
    strings.iter().map(|s| encode_one(s.as_ref(), vocab)).collect()
}

pub fn encode_one(text: &str, vocab: &Vocabulary) -> CoreResult<Vec<u32>> {
    text.chars().map(|c| vocab.id_of(c)).collect()
}

/// Inverse of `encode_one`. Padding ids decode to nothing.
pub fn decode(ids: &[u32], vocab: &Vocabulary) -> CoreResult<String> {
    let mut out = String::with_capacity(ids.len());
    for &id in ids {
        out.push_str(&vocab.symbol_of(id)?);
    }
    Ok(out)
}

/// Pad (or truncate) every sequence to `length`, or to the longest
/// sequence present when `length` is None.
///
/// The result always has `sequences.len()` rows of exactly that length.
pub fn pad(sequences: &[Vec<u32>], length: Option<usize>, side: PadSide) -> Vec<Vec<u32>> {
    let length = length.unwrap_or_else(|| sequences.iter().map(Vec::len).max().unwrap_or(0));

    sequences
        .iter()
        .map(|seq| {
            let kept    = &seq[..seq.len().min(length)];
            let filler  = length - kept.len();
            let mut row = Vec::with_capacity(length);
            match side {
                PadSide::End => {
                    row.extend_from_slice(kept);
                    row.resize(length, PAD_ID);
                }
                PadSide::Start => {
                    row.resize(filler, PAD_ID);
                    row.extend_from_slice(kept);
                }
            }
            row
        })
        .collect()
}
