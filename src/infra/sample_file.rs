// ============================================================
// Layer 6 — JSON-lines Sample Store
// ============================================================
// A SampleStore over a local JSON-lines file, one stored sample
// per line:
//
//   {"model":"topics","seq":"rates rise","use_for_training":true,
//    "training_labels":[{"topic":"economy"}]}
//
// `seq_hash` is optional; when missing it is the hex SHA-256 of
// `seq`. Queries return the model's training samples ordered by
// seq_hash descending, capped at `limit`.
//
// Appends go through the process-wide sample lock, like every
// other sample write.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use crate::data::snapshot::sample_lock;
use crate::domain::error::TrainError;
use crate::domain::sample::{LabeledSample, TrainingLabel};
use crate::domain::traits::SampleStore;

/// One line of the samples file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSample {
    pub model: String,
    pub seq:   String,

    #[serde(default)]
    pub use_for_training: bool,

    #[serde(default)]
    pub training_labels: Vec<TrainingLabel>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq_hash: Option<String>,
}

impl StoredSample {
    pub fn hash(&self) -> String {
        self.seq_hash.clone().unwrap_or_else(|| seq_hash(&self.seq))
    }
}

/// Hex SHA-256 of a sequence.
pub fn seq_hash(seq: &str) -> String {
    hex::encode(Sha256::digest(seq.as_bytes()))
}

pub struct JsonlSampleStore {
    path: PathBuf,
}

impl JsonlSampleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every stored sample, in file order. Blank lines are skipped.
    pub fn read_all(&self) -> Result<Vec<StoredSample>> {
        let text = fs::read_to_string(&self.path).map_err(|e| TrainError::io(&self.path, e))?;
        text.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str(line).with_context(|| {
                    format!("Bad sample on line {} of '{}'", n + 1, self.path.display())
                })
            })
            .collect()
    }

    pub fn append(&self, samples: &[StoredSample]) -> Result<()> {
        let _guard = sample_lock();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| TrainError::io(&self.path, e))?;
        for sample in samples {
            let line = serde_json::to_string(sample)?;
            writeln!(file, "{line}").map_err(|e| TrainError::io(&self.path, e))?;
        }
        Ok(())
    }
}

impl SampleStore for JsonlSampleStore {
    fn training_samples(&self, model: &str, limit: usize) -> Result<Vec<LabeledSample>> {
        let mut matching: Vec<(String, StoredSample)> = self
            .read_all()?
            .into_iter()
            .filter(|s| s.model == model && s.use_for_training)
            .map(|s| (s.hash(), s))
            .collect();

        matching.sort_by(|a, b| b.0.cmp(&a.0));
        matching.truncate(limit);

        tracing::debug!(
            "Read {} training samples for '{}' from '{}'",
            matching.len(),
            model,
            self.path.display()
        );
        Ok(matching
            .into_iter()
            .map(|(_, s)| LabeledSample { seq: s.seq, training_labels: s.training_labels })
            .collect())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn stored(model: &str, seq: &str, train: bool, hash: Option<&str>) -> StoredSample {
        StoredSample {
            model: model.into(),
            seq: seq.into(),
            use_for_training: train,
            training_labels: vec![TrainingLabel { topic: "a".into() }],
            seq_hash: hash.map(str::to_string),
        }
    }

    #[test]
    fn test_seq_hash_is_sha256_hex() {
        assert_eq!(
            seq_hash("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_filters_sorts_and_limits() {
        let dir   = tempdir().unwrap();
        let store = JsonlSampleStore::new(dir.path().join("samples.jsonl"));
        store
            .append(&[
                stored("topics", "first", true, Some("b")),
                stored("topics", "second", true, Some("d")),
                stored("topics", "skipped", false, Some("z")),
                stored("other", "other model", true, Some("y")),
                stored("topics", "third", true, Some("c")),
            ])
            .unwrap();

        let all: Vec<String> = store
            .training_samples("topics", 10)
            .unwrap()
            .into_iter()
            .map(|s| s.seq)
            .collect();
        assert_eq!(all, vec!["second", "third", "first"]);

        let top = store.training_samples("topics", 2).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].seq, "second");
    }

    #[test]
    fn test_reads_handwritten_lines() {
        let dir  = tempdir().unwrap();
        let path = dir.path().join("samples.jsonl");
        fs::write(
            &path,
            "{\"model\":\"m\",\"seq\":\"x\",\"use_for_training\":true,\
             \"training_labels\":[{\"topic\":\"t\"},{\"topic\":\"t\"}]}\n\n",
        )
        .unwrap();

        let samples = JsonlSampleStore::new(&path).training_samples("m", 5).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].distinct_topics(), vec!["t"]);
    }

    #[test]
    fn test_bad_line_reports_line_number() {
        let dir  = tempdir().unwrap();
        let path = dir.path().join("samples.jsonl");
        fs::write(&path, "not json\n").unwrap();
        let err = JsonlSampleStore::new(&path).read_all().unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }
}
