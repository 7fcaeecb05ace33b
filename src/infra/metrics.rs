// ============================================================
// Layer 6: Metrics Logger
// ============================================================
// Appends one CSV row per epoch, one file per model variant,
// so learning curves can be plotted after (or during) a run.
//
// Output file: <dir>/metrics_<VARIANT>.csv
//
//   epoch,train_loss,val_loss,train_acc,val_acc
//   1,3.124500,3.089200,,
//   2,2.890100,2.854300,,
//
// The accuracy columns stay empty for the generator.
//
//   MetricsLogger::new     fresh run: the file starts over
//   MetricsLogger::resume  resumed run: rows are appended and
//                          numbered after the last logged epoch

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use crate::domain::error::{CoreError, CoreResult};
use crate::domain::history::EpochRecord;

const HEADER: &str = "epoch,train_loss,val_loss,train_acc,val_acc";

pub struct MetricsLogger {
    csv_path:     PathBuf,
    /// Epochs logged by earlier runs of the same variant
    epoch_offset: usize,
}

impl MetricsLogger {
    /// Start a new log for `variant`, replacing any earlier one.
    pub fn new(dir: impl Into<PathBuf>, variant: &str) -> CoreResult<Self> {
        let csv_path = Self::prepare(dir.into(), variant)?;
        write_header(&csv_path)?;
        Ok(Self { csv_path, epoch_offset: 0 })
    }

    /// Keep the existing log of `variant` and continue its epoch numbers.
    pub fn resume(dir: impl Into<PathBuf>, variant: &str) -> CoreResult<Self> {
        let csv_path = Self::prepare(dir.into(), variant)?;
        if !csv_path.exists() {
            write_header(&csv_path)?;
            return Ok(Self { csv_path, epoch_offset: 0 });
        }

        let text = fs::read_to_string(&csv_path).map_err(|e| CoreError::data_access(&csv_path, e))?;
        let epoch_offset = text
            .lines()
            .skip(1)
            .filter_map(|line| line.split(',').next()?.parse::<usize>().ok())
            .max()
            .unwrap_or(0);
        tracing::debug!("Appending to '{}' after epoch {}", csv_path.display(), epoch_offset);
        Ok(Self { csv_path, epoch_offset })
    }

    fn prepare(dir: PathBuf, variant: &str) -> CoreResult<PathBuf> {
        fs::create_dir_all(&dir).map_err(|e| CoreError::data_access(&dir, e))?;
        Ok(dir.join(format!("metrics_{variant}.csv")))
    }

    pub fn log(&self, r: &EpochRecord) -> CoreResult<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .map_err(|e| CoreError::data_access(&self.csv_path, e))?;

        writeln!(
            f,
            "{},{:.6},{:.6},{},{}",
            r.epoch + self.epoch_offset,
            r.train_loss,
            r.val_loss,
            optional(r.train_acc),
            optional(r.val_acc),
        )
        .map_err(|e| CoreError::data_access(&self.csv_path, e))?;
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    pub fn epoch_offset(&self) -> usize {
        self.epoch_offset
    }
}

fn write_header(path: &Path) -> CoreResult<()> {
    fs::write(path, format!("{HEADER}\n")).map_err(|e| CoreError::data_access(path, e))?;
    tracing::debug!("Created metrics CSV: '{}'", path.display());
    Ok(())
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.6}")).unwrap_or_default()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn record(epoch: usize, acc: Option<f64>) -> EpochRecord {
        EpochRecord { epoch, train_loss: 2.5, val_loss: 2.25, train_acc: acc, val_acc: acc }
    }

    fn lines(logger: &MetricsLogger) -> Vec<String> {
        fs::read_to_string(logger.csv_path()).unwrap().lines().map(String::from).collect()
    }

    #[test]
    fn test_resumed_rows_continue_epoch_numbers() {
        let dir    = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path(), "GRU").unwrap();
        logger.log(&record(1, None)).unwrap();
        logger.log(&record(2, None)).unwrap();

        // a resumed run counts its own epochs from 1 again
        let again = MetricsLogger::resume(dir.path(), "GRU").unwrap();
        assert_eq!(again.epoch_offset(), 2);
        again.log(&record(1, Some(0.5))).unwrap();

        assert_eq!(lines(&again), vec![
            HEADER,
            "1,2.500000,2.250000,,",
            "2,2.500000,2.250000,,",
            "3,2.500000,2.250000,0.500000,0.500000",
        ]);
    }

    #[test]
    fn test_fresh_run_starts_a_new_log() {
        let dir = tempfile::tempdir().unwrap();
        MetricsLogger::new(dir.path(), "RNN").unwrap().log(&record(1, None)).unwrap();

        let fresh = MetricsLogger::new(dir.path(), "RNN").unwrap();
        assert_eq!(lines(&fresh), vec![HEADER.to_string()]);
    }

    #[test]
    fn test_resume_without_log_starts_at_zero() {
        let dir    = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::resume(dir.path(), "LSTM").unwrap();
        assert_eq!(logger.epoch_offset(), 0);
        assert_eq!(lines(&logger), vec![HEADER.to_string()]);
    }
}
