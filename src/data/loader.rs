// ============================================================
// Layer 4: Corpus Loaders
// ============================================================
// Two on-disk corpus layouts:
//
//   NameListLoader     one file, one name per line
//                      (generation task)
//
//   CategoryDirLoader  a directory of files, one per category,
//                      one name per line; the category is the
//                      file stem, e.g. data/names/Irish.txt
//                      (classification task)
//
// Both shuffle the loaded examples with the caller's RNG and
// skip blank lines. A missing path is a DataAccess error: the
// caller decides what to do, nothing is retried here.

use std::{
    fs,
    path::{Path, PathBuf},
};

use rand::{seq::SliceRandom, RngCore};

use crate::data::preprocessor::Preprocessor;
use crate::domain::error::{CoreError, CoreResult};
use crate::domain::traits::{CorpusSource, RawExample};

/// Loads a newline-separated list of names.
pub struct NameListLoader {
    path: PathBuf,
    preprocessor: Preprocessor,
}

impl NameListLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), preprocessor: Preprocessor::new() }
    }
}

impl CorpusSource for NameListLoader {
    fn load_all(&self, rng: &mut dyn RngCore) -> CoreResult<Vec<RawExample>> {
        let text = fs::read_to_string(&self.path)
            .map_err(|e| CoreError::data_access(&self.path, e))?;

        let mut examples: Vec<RawExample> = self
            .preprocessor
            .lines(&text)?
            .into_iter()
            .map(RawExample::unlabelled)
            .collect();
        examples.shuffle(rng);

        tracing::info!("Loaded {} names from '{}'", examples.len(), self.path.display());
        Ok(examples)
    }
}

/// Loads one category per file from a directory.
pub struct CategoryDirLoader {
    dir: PathBuf,
    preprocessor: Preprocessor,
}

impl CategoryDirLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), preprocessor: Preprocessor::new() }
    }

    /// Use a different per-line normalisation (e.g. ASCII folding)
    pub fn with_preprocessor(mut self, preprocessor: Preprocessor) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    /// Category files sorted by name, so label ids are stable across runs
    fn category_files(&self) -> CoreResult<Vec<(String, PathBuf)>> {
        let entries = fs::read_dir(&self.dir)
            .map_err(|e| CoreError::data_access(&self.dir, e))?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| CoreError::data_access(&self.dir, e))?.path();
            if !path.is_file() {
                continue;
            }
            match category_name(&path) {
                Some(label) => files.push((label, path)),
                None => tracing::warn!("Skipping '{}': no usable file stem", path.display()),
            }
        }
        files.sort();

        if files.is_empty() {
            return Err(CoreError::data_access(&self.dir, "no category files found"));
        }
        Ok(files)
    }
}

impl CorpusSource for CategoryDirLoader {
    fn load_all(&self, rng: &mut dyn RngCore) -> CoreResult<Vec<RawExample>> {
        let mut examples = Vec::new();

        for (label, path) in self.category_files()? {
            let text = fs::read_to_string(&path)
                .map_err(|e| CoreError::data_access(&path, e))?;
            let names = self.preprocessor.lines(&text)?;
            tracing::debug!("Loaded: {} ({} names)", label, names.len());
            examples.extend(names.into_iter().map(|n| RawExample::labelled(n, label.clone())));
        }

        examples.shuffle(rng);
        tracing::info!("Loaded {} labelled names from '{}'", examples.len(), self.dir.display());
        Ok(examples)
    }

    fn categories(&self) -> CoreResult<Vec<String>> {
        Ok(self.category_files()?.into_iter().map(|(label, _)| label).collect())
    }
}

fn category_name(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty() && !s.starts_with('.'))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_name_list_skips_blank_lines() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("names.txt");
        fs::write(&path, "Anna\n\nBob\r\nCleo\n").unwrap();

        let mut rng  = StdRng::seed_from_u64(7);
        let examples = NameListLoader::new(&path).load_all(&mut rng).unwrap();
        let mut names: Vec<_> = examples.iter().map(|e| e.text.clone()).collect();
        names.sort();
        assert_eq!(names, vec!["Anna", "Bob", "Cleo"]);
        assert!(examples.iter().all(|e| e.label.is_none()));
    }

    #[test]
    fn test_missing_file_is_data_access_error() {
        let mut rng = StdRng::seed_from_u64(7);
        let err = NameListLoader::new("/definitely/not/here.txt").load_all(&mut rng);
        assert!(matches!(err, Err(CoreError::DataAccess { .. })));
    }

    #[test]
    fn test_category_taken_from_file_stem() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Irish.txt"), "Aodh\nBrian\n").unwrap();
        fs::write(dir.path().join("Czech.txt"), "Novak\n").unwrap();

        let loader = CategoryDirLoader::new(dir.path());
        assert_eq!(loader.categories().unwrap(), vec!["Czech", "Irish"]);

        let mut rng  = StdRng::seed_from_u64(1);
        let examples = loader.load_all(&mut rng).unwrap();
        assert_eq!(examples.len(), 3);
        assert!(examples.contains(&RawExample::labelled("Novak", "Czech")));
        assert!(examples.contains(&RawExample::labelled("Brian", "Irish")));
    }

    #[test]
    fn test_seeded_shuffle_is_reproducible() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("names.txt");
        let body: String = (0..50).map(|i| format!("name{i}\n")).collect();
        fs::write(&path, body).unwrap();

        let loader = NameListLoader::new(&path);
        let a = loader.load_all(&mut StdRng::seed_from_u64(3)).unwrap();
        let b = loader.load_all(&mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(a, b);
    }
}
