// ============================================================
// Layer 4: Text Preprocessor
// ============================================================
// Turns the raw contents of a corpus file into clean names,
// one per line.
//
// Cleaning steps (applied per line, in order):
//   1. Map tabs, NBSP, zero-width space and BOM to a space
//   2. Replace any other control character with a space
//   3. Collapse runs of spaces, trim both ends
//   4. (AsciiLetters only) NFD-decompose, drop combining marks,
//      drop anything outside ALL_LETTERS: "Émile" -> "Emile"
//   5. Drop the line if nothing is left
//
// Step 4 uses the NFD and StripAccents normalizers from the
// tokenizers crate.

use tokenizers::normalizers::{StripAccents, NFD};
use tokenizers::{NormalizedString, Normalizer};

use crate::domain::error::{CoreError, CoreResult};

/// Alphabet of the one-hot classifier: ASCII letters plus ".,;"
pub const ALL_LETTERS: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ.,;";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Normalization {
    /// Keep every printable character
    #[default]
    Plain,
    /// Fold to the ALL_LETTERS alphabet
    AsciiLetters,
}

#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    normalization: Normalization,
}

impl Preprocessor {
    pub fn new() -> Self {
        Self { normalization: Normalization::Plain }
    }

    pub fn ascii_letters() -> Self {
        Self { normalization: Normalization::AsciiLetters }
    }

    /// Split a file body into cleaned, non-empty lines.
    pub fn lines(&self, text: &str) -> CoreResult<Vec<String>> {
        let mut out = Vec::new();
        for line in text.split('\n') {
            let cleaned = self.clean(line)?;
            if !cleaned.is_empty() {
                out.push(cleaned);
            }
        }
        Ok(out)
    }

    /// Clean a single line.
    pub fn clean(&self, line: &str) -> CoreResult<String> {
        let mapped: String = line
            .chars()
            .map(|c| match c {
                '\t' | '\u{00A0}' | '\u{200B}' | '\u{FEFF}' => ' ',
                c if c.is_control() => ' ',
                c => c,
            })
            .collect();

        let mut collapsed  = String::with_capacity(mapped.len());
        let mut last_space = false;
        for c in mapped.trim().chars() {
            if c == ' ' {
                if !last_space {
                    collapsed.push(' ');
                }
                last_space = true;
            } else {
                collapsed.push(c);
                last_space = false;
            }
        }

        match self.normalization {
            Normalization::Plain        => Ok(collapsed),
            Normalization::AsciiLetters => fold_to_ascii_letters(&collapsed),
        }
    }
}

/// Strip accents and keep only characters of ALL_LETTERS.
pub fn fold_to_ascii_letters(text: &str) -> CoreResult<String> {
    let mut normalized = NormalizedString::from(text);
    NFD.normalize(&mut normalized)
        .map_err(|e| CoreError::Normalization(e.to_string()))?;
    StripAccents
        .normalize(&mut normalized)
        .map_err(|e| CoreError::Normalization(e.to_string()))?;

    Ok(normalized
        .get()
        .chars()
        .filter(|c| ALL_LETTERS.contains(*c))
        .collect())
}
