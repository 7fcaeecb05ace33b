// ============================================================
// Layer 6: Vocabulary Store
// ============================================================
// Persists the symbol tables and the label set next to the
// checkpoints:
//
//   <dir>/vocab.json             symbol -> id
//   <dir>/vocab_int2char.json    id -> symbol
//   <dir>/labels.json            ordered category names
//
// A trained model's embedding rows are tied to the ids, so an
// existing vocabulary is always loaded, never rebuilt. Presence
// is an explicit check: `load` returns Ok(None) when neither
// file exists and an error when only one of them does.

use std::path::{Path, PathBuf};
use std::collections::BTreeMap;
use std::fs;

use crate::domain::error::{CoreError, CoreResult};
use crate::domain::labels::LabelSet;
use crate::domain::vocabulary::Vocabulary;
use crate::infra::checkpoint::{read_json, write_json};

const CHAR2INT_FILE: &str = "vocab.json";
const INT2CHAR_FILE: &str = "vocab_int2char.json";
const LABELS_FILE:   &str = "labels.json";

pub struct VocabStore {
    dir: PathBuf,
}

impl VocabStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Load the persisted vocabulary, or build one from `texts` and save it.
    pub fn load_or_build<S: AsRef<str>>(&self, texts: &[S]) -> CoreResult<Vocabulary> {
        match self.load()? {
            Some(vocab) => {
                tracing::info!("Loaded existing vocabulary ({} symbols)", vocab.size());
                Ok(vocab)
            }
            None => {
                let vocab = Vocabulary::build(texts);
                tracing::info!("Built new vocabulary ({} symbols)", vocab.size());
                self.save(&vocab)?;
                Ok(vocab)
            }
        }
    }

    pub fn load(&self) -> CoreResult<Option<Vocabulary>> {
        let forward  = self.dir.join(CHAR2INT_FILE);
        let backward = self.dir.join(INT2CHAR_FILE);

        match (forward.is_file(), backward.is_file()) {
            (false, false) => return Ok(None),
            (true, false)  => return Err(CoreError::data_access(&backward, "missing, but vocab.json exists")),
            (false, true)  => return Err(CoreError::data_access(&forward, "missing, but vocab_int2char.json exists")),
            (true, true)   => {}
        }

        let int2char: BTreeMap<u32, String> = read_json(&backward)?;
        let char2int: BTreeMap<String, u32> = read_json(&forward)?;
        let vocab = Vocabulary::from_int2char(&int2char)?;
        if vocab.char2int_table() != char2int {
            return Err(CoreError::InvalidConfig(format!(
                "'{}' and '{}' disagree",
                forward.display(),
                backward.display()
            )));
        }
        Ok(Some(vocab))
    }

    pub fn save(&self, vocab: &Vocabulary) -> CoreResult<()> {
        self.ensure_dir()?;
        write_json(&self.dir.join(CHAR2INT_FILE), &vocab.char2int_table())?;
        write_json(&self.dir.join(INT2CHAR_FILE), &vocab.int2char_table())?;
        tracing::debug!("Saved vocabulary to '{}'", self.dir.display());
        Ok(())
    }

    /// Persisted label set, if any.
    pub fn load_labels(&self) -> CoreResult<Option<LabelSet>> {
        let path = self.dir.join(LABELS_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        read_json(&path).map(Some)
    }

    pub fn save_labels(&self, labels: &LabelSet) -> CoreResult<()> {
        self.ensure_dir()?;
        write_json(&self.dir.join(LABELS_FILE), labels)
    }

    /// Reuse the persisted label set, otherwise persist `categories`.
    ///
    /// A persisted set that differs from the corpus categories is an
    /// error: label ids would silently change meaning.
    pub fn load_or_save_labels(&self, categories: Vec<String>) -> CoreResult<LabelSet> {
        let fresh = LabelSet::new(categories);
        match self.load_labels()? {
            Some(stored) if stored != fresh => Err(CoreError::InvalidConfig(format!(
                "persisted labels {:?} differ from corpus categories {:?}",
                stored.names(),
                fresh.names()
            ))),
            Some(stored) => Ok(stored),
            None => {
                self.save_labels(&fresh)?;
                Ok(fresh)
            }
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn ensure_dir(&self) -> CoreResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| CoreError::data_access(&self.dir, e))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_vocabulary_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(VocabStore::new(dir.path()).load().unwrap().is_none());
    }

    #[test]
    fn test_persisted_vocabulary_wins() {
        let dir   = tempfile::tempdir().unwrap();
        let store = VocabStore::new(dir.path());

        let first  = store.load_or_build(&["abc"]).unwrap();
        let second = store.load_or_build(&["xyz"]).unwrap();
        assert_eq!(first, second);
        assert!(second.id_of('a').is_ok());
        assert!(matches!(second.id_of('x'), Err(CoreError::UnknownSymbol { symbol: 'x' })));
    }

    #[test]
    fn test_half_a_vocabulary_is_an_error() {
        let dir   = tempfile::tempdir().unwrap();
        let store = VocabStore::new(dir.path());
        store.save(&Vocabulary::build(&["ab"])).unwrap();
        fs::remove_file(dir.path().join(INT2CHAR_FILE)).unwrap();
        assert!(matches!(store.load(), Err(CoreError::DataAccess { .. })));
    }

    #[test]
    fn test_pad_entry_is_persisted() {
        let dir   = tempfile::tempdir().unwrap();
        let store = VocabStore::new(dir.path());
        store.save(&Vocabulary::build(&["ab"])).unwrap();
        let json = fs::read_to_string(dir.path().join(INT2CHAR_FILE)).unwrap();
        assert!(json.contains("<PAD>"));
    }

    #[test]
    fn test_labels_are_reused_and_checked() {
        let dir   = tempfile::tempdir().unwrap();
        let store = VocabStore::new(dir.path());
        let names = vec!["Czech".to_string(), "Irish".to_string()];

        assert!(store.load_labels().unwrap().is_none());
        let saved = store.load_or_save_labels(names.clone()).unwrap();
        assert_eq!(store.load_or_save_labels(names).unwrap(), saved);
        assert!(store.load_or_save_labels(vec!["Greek".to_string()]).is_err());
    }
}
