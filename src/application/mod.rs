// ============================================================
// Layer 2: Application / Use Cases
// ============================================================
// Wires the lower layers into the workflows the CLI exposes.
//
// Rules for this layer:
//   - No tensor math here (Layer 5)
//   - No printing here (Layer 1)
//   - Errors leave as anyhow::Error; the CoreError inside can
//     still be recovered with downcast_ref

/// Training pipelines for the generator and both classifiers
pub mod train_use_case;

/// Name generation and classification with trained models
pub mod infer_use_case;

#[cfg(test)]
pub(crate) mod fixtures {
    use std::{
        fs,
        path::{Path, PathBuf},
    };

    use super::train_use_case::TrainConfig;
    use crate::domain::cell::CellKind;

    pub fn write_names(dir: &Path) -> PathBuf {
        let path = dir.join("names.txt");
        fs::write(&path, "Anna\nAlex\nAlice\nBob\nBella\nCarla\nChris\nDana\nDavid\nEmma\n").unwrap();
        path
    }

    pub fn write_categories(dir: &Path) -> PathBuf {
        let root = dir.join("names");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("Czech.txt"), "Novak\nDvořák\nSvoboda\nNovotny\nCerny\nProchazka\n").unwrap();
        fs::write(root.join("Irish.txt"), "Kelly\nMurphy\nWalsh\nByrne\nRyan\nO'Brien\n").unwrap();
        root
    }

    /// A small GRU run over `corpus` writing into `artifacts`
    pub fn quick(mut cfg: TrainConfig, corpus: PathBuf, artifacts: &Path) -> TrainConfig {
        cfg.corpus         = corpus.to_string_lossy().into_owned();
        cfg.artifact_dir   = artifacts.to_string_lossy().into_owned();
        cfg.cell           = CellKind::Gru;
        cfg.batch_size     = cfg.batch_size.min(4);
        cfg.epochs         = 2;
        cfg.hidden_size    = 8;
        cfg.embedding_size = 4;
        cfg.print_every    = 1;
        cfg
    }
}
