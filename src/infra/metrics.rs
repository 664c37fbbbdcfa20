// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records the training loss at every checkpoint step to a CSV
// file next to the checkpoints.
//
// Output file: train/metrics.csv
//
//   step,loss,learning_rate
//   500,0.412300,0.011111
//   1000,0.298100,0.000000

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
};

use crate::domain::error::TrainError;

/// One row of metrics for a checkpoint step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepMetrics {
    pub step: usize,

    /// Binary cross-entropy of the batch that ran at this step
    pub loss: f64,

    pub learning_rate: f64,
}

impl StepMetrics {
    pub fn new(step: usize, loss: f64, learning_rate: f64) -> Self {
        Self { step, loss, learning_rate }
    }
}

/// Appends step metrics to a CSV file.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|e| TrainError::io(dir, e))?;
        let csv_path = dir.join("metrics.csv");

        if !csv_path.exists() {
            let mut w = csv::Writer::from_path(&csv_path)?;
            w.write_record(["step", "loss", "learning_rate"])?;
            w.flush().map_err(|e| TrainError::io(&csv_path, e))?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &StepMetrics) -> Result<()> {
        let file = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .map_err(|e| TrainError::io(&self.csv_path, e))?;
        let mut w = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        w.write_record([
            m.step.to_string(),
            format!("{:.6}", m.loss),
            format!("{:.6}", m.learning_rate),
        ])?;
        w.flush().map_err(|e| TrainError::io(&self.csv_path, e))?;
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    /// Read every logged row back.
    pub fn read_all(&self) -> Result<Vec<StepMetrics>> {
        let mut reader = csv::Reader::from_path(&self.csv_path)?;
        let rows = reader
            .deserialize::<StepMetrics>()
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_appends_rows_under_one_header() {
        let dir = tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&StepMetrics::new(500, 0.5, 0.01)).unwrap();

        // A second logger on the same dir keeps the existing file
        let again = MetricsLogger::new(dir.path()).unwrap();
        again.log(&StepMetrics::new(1000, 0.25, 0.0)).unwrap();

        let rows = again.read_all().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].step, 500);
        assert_eq!(rows[1].loss, 0.25);

        let raw = std::fs::read_to_string(again.csv_path()).unwrap();
        assert_eq!(raw.lines().next(), Some("step,loss,learning_rate"));
    }
}
