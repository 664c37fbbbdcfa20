// ============================================================
// Layer 3 — Samples, Rows and Examples
// ============================================================
// Three shapes of the same text as it moves through a run:
//
//   LabeledSample  → what the sample datastore hands us
//                    (text + annotator topic labels)
//   DatasetRow     → one snapshot row: text + multi-hot vector
//   Example        → one row prepared for feature building,
//                    with a stable id ("train-3", "test-0")
//
// Reference: Rust Book §5 (Structs)

use serde::{Deserialize, Serialize};

/// A topic label attached to a sample by an annotator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingLabel {
    pub topic: String,
}

/// A labeled text sample as owned by the sample datastore.
/// Read-only to the training pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledSample {
    pub seq: String,

    #[serde(default)]
    pub training_labels: Vec<TrainingLabel>,
}

impl LabeledSample {
    pub fn new<S: Into<String>>(seq: impl Into<String>, topics: impl IntoIterator<Item = S>) -> Self {
        Self {
            seq: seq.into(),
            training_labels: topics
                .into_iter()
                .map(|t| TrainingLabel { topic: t.into() })
                .collect(),
        }
    }

    /// Distinct topics in first-seen order.
    pub fn distinct_topics(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for label in &self.training_labels {
            if !out.contains(&label.topic.as_str()) {
                out.push(&label.topic);
            }
        }
        out
    }
}

/// One row of a captured training snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetRow {
    pub seq:            String,
    pub one_hot_labels: Vec<u8>,
}

/// Which side of the split an example is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetType {
    Train,
    /// Scoring only: labels are always the all-zero vector.
    Test,
}

impl SetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SetType::Train => "train",
            SetType::Test  => "test",
        }
    }
}

/// A single example ready for feature building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Example {
    /// "<set>-<row index>"
    pub guid:   String,
    pub text:   String,
    pub labels: Vec<u8>,
}

impl Example {
    pub fn num_classes(&self) -> usize {
        self.labels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinct_topics_collapse_duplicates() {
        let s = LabeledSample::new("text", ["water", "health", "water"]);
        assert_eq!(s.distinct_topics(), vec!["water", "health"]);
    }

    #[test]
    fn test_missing_labels_deserialize_empty() {
        let s: LabeledSample = serde_json::from_str(r#"{"seq":"hello"}"#).unwrap();
        assert!(s.training_labels.is_empty());
    }
}
