// ============================================================
// Layer 3: Vocabulary
// ============================================================
// Bidirectional character <-> id table.
//
//   id 0      -> padding sentinel, never a real character
//   id 1..=N  -> the N distinct characters of the corpus
//
// Ids are assigned over the sorted character set so two builds
// over the same corpus agree. Once a model is trained its
// embedding rows are tied to these ids, which is why the
// vocabulary is persisted and reused instead of rebuilt
// (see infra::vocab_store).

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::domain::error::{CoreError, CoreResult};

/// Id reserved for padding
pub const PAD_ID: u32 = 0;

/// Textual form of the padding entry in the persisted id -> symbol map
pub const PAD_TOKEN: &str = "<PAD>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    char2int: HashMap<char, u32>,
    int2char: BTreeMap<u32, char>,
}

impl Vocabulary {
    /// Collect the distinct characters of `texts` and number them from 1.
    pub fn build<S: AsRef<str>>(texts: &[S]) -> Self {
        let chars: BTreeSet<char> = texts
            .iter()
            .flat_map(|t| t.as_ref().chars())
            .collect();

        let int2char: BTreeMap<u32, char> = chars
            .into_iter()
            .enumerate()
            .map(|(i, c)| (i as u32 + 1, c))
            .collect();
        let char2int = int2char.iter().map(|(&id, &c)| (c, id)).collect();

        Self { char2int, int2char }
    }

    /// Rebuild from a persisted id -> symbol table.
    ///
    /// The table may carry the `<PAD>` entry at id 0; every other
    /// entry must be exactly one character with a non-zero id.
    pub fn from_int2char(table: &BTreeMap<u32, String>) -> CoreResult<Self> {
        let mut int2char = BTreeMap::new();
        for (&id, symbol) in table {
            if id == PAD_ID {
                if symbol != PAD_TOKEN {
                    return Err(CoreError::InvalidConfig(format!(
                        "id 0 is reserved for {PAD_TOKEN}, found {symbol:?}"
                    )));
                }
                continue;
            }
            let mut chars = symbol.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => {
                    int2char.insert(id, c);
                }
                _ => {
                    return Err(CoreError::InvalidConfig(format!(
                        "vocabulary entry {id} is not a single character: {symbol:?}"
                    )))
                }
            }
        }
        let char2int: HashMap<char, u32> = int2char.iter().map(|(&id, &c)| (c, id)).collect();
        if char2int.len() != int2char.len() {
            return Err(CoreError::InvalidConfig(
                "vocabulary maps one character to several ids".to_string(),
            ));
        }
        Ok(Self { char2int, int2char })
    }

    /// Persistable symbol -> id table, `<PAD>` included.
    pub fn char2int_table(&self) -> BTreeMap<String, u32> {
        let mut table: BTreeMap<String, u32> = self
            .char2int
            .iter()
            .map(|(c, &id)| (c.to_string(), id))
            .collect();
        table.insert(PAD_TOKEN.to_string(), PAD_ID);
        table
    }

    /// Persistable id -> symbol table, `<PAD>` included.
    pub fn int2char_table(&self) -> BTreeMap<u32, String> {
        let mut table: BTreeMap<u32, String> = self
            .int2char
            .iter()
            .map(|(&id, c)| (id, c.to_string()))
            .collect();
        table.insert(PAD_ID, PAD_TOKEN.to_string());
        table
    }

    pub fn id_of(&self, c: char) -> CoreResult<u32> {
        self.char2int
            .get(&c)
            .copied()
            .ok_or(CoreError::UnknownSymbol { symbol: c })
    }

    /// Decode one id. The padding id decodes to an empty string.
    pub fn symbol_of(&self, id: u32) -> CoreResult<String> {
        if id == PAD_ID {
            return Ok(String::new());
        }
        self.int2char
            .get(&id)
            .map(|c| c.to_string())
            .ok_or(CoreError::UnknownId { id: id as usize })
    }

    /// Embedding table size: real characters plus the padding row.
    pub fn size(&self) -> usize {
        self.int2char.len() + 1
    }
}
