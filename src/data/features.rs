// ============================================================
// Layer 4 — Feature Builder
// ============================================================
// Turns examples into fixed-width feature records:
//
//   text ──embed──▶ [k, D] vectors ──pad/trim──▶ [MAX_LEN, D]
//                                               + mask [MAX_LEN]
//                                               + labels [num_classes]
//
// Both the matrix and the mask start zeroed. The first
// min(k, MAX_LEN) rows are copied in and their mask bits set.
// Longer sequences are truncated at MAX_LEN, never rejected.
//
// The embedding provider is called once with every text in the
// batch. A provider that answers with a different number of
// sequences than it was asked for aborts the run.
//
// Reference: Devlin et al. (2019) BERT — input masks and padding

use anyhow::Result;

use crate::domain::error::TrainError;
use crate::domain::sample::{DatasetRow, Example, SetType};
use crate::domain::traits::EmbeddingProvider;

/// Default fixed sequence width, matching the embedding service.
pub const DEFAULT_MAX_SEQ_LEN: usize = 128;

/// One padded example. `embeddings` is row-major `[max_len, hidden_size]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    pub embeddings:  Vec<f32>,
    pub input_mask:  Vec<u8>,
    pub label_ids:   Vec<u8>,
    pub max_len:     usize,
    pub hidden_size: usize,
}

impl FeatureRecord {
    /// Pad or truncate one embedding sequence to `max_len` rows.
    /// Every vector in `sequence` must be `hidden_size` wide.
    pub fn from_sequence(
        sequence:    &[Vec<f32>],
        label_ids:   Vec<u8>,
        max_len:     usize,
        hidden_size: usize,
    ) -> Self {
        let mut embeddings = vec![0.0f32; max_len * hidden_size];
        let mut input_mask = vec![0u8; max_len];

        for (pos, vector) in sequence.iter().take(max_len).enumerate() {
            let start = pos * hidden_size;
            embeddings[start..start + hidden_size].copy_from_slice(vector);
            input_mask[pos] = 1;
        }

        Self { embeddings, input_mask, label_ids, max_len, hidden_size }
    }

    /// The embedding row at `pos`
    pub fn row(&self, pos: usize) -> &[f32] {
        let start = pos * self.hidden_size;
        &self.embeddings[start..start + self.hidden_size]
    }

    /// Number of real (unpadded) positions
    pub fn real_len(&self) -> usize {
        self.input_mask.iter().filter(|&&m| m == 1).count()
    }

    pub fn num_classes(&self) -> usize {
        self.label_ids.len()
    }
}

/// Build examples from snapshot rows. Train examples carry the row's
/// multi-hot labels; test examples always get the all-zero vector.
pub fn create_examples(rows: &[DatasetRow], num_classes: usize, set_type: SetType) -> Vec<Example> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            let labels = match set_type {
                SetType::Train => row.one_hot_labels.clone(),
                SetType::Test  => vec![0u8; num_classes],
            };
            Example {
                guid: format!("{}-{}", set_type.as_str(), index),
                text: row.seq.clone(),
                labels,
            }
        })
        .collect()
}

/// Embed every example in one provider call and pad the results.
/// Output order matches `examples` one-to-one.
pub fn build_features(
    examples: &[Example],
    provider: &dyn EmbeddingProvider,
    max_len:  usize,
) -> Result<Vec<FeatureRecord>> {
    if examples.is_empty() {
        return Ok(Vec::new());
    }

    let num_classes = examples[0].num_classes();
    if let Some(bad) = examples.iter().find(|e| e.num_classes() != num_classes) {
        return Err(TrainError::ContractViolation(format!(
            "example {} has {} label columns, expected {}",
            bad.guid,
            bad.num_classes(),
            num_classes
        ))
        .into());
    }

    let texts: Vec<String> = examples.iter().map(|e| e.text.clone()).collect();
    let sequences = provider.embed(&texts)?;

    if sequences.len() != texts.len() {
        return Err(TrainError::ContractViolation(format!(
            "embedding provider '{}' returned {} results for {} texts",
            provider.id(),
            sequences.len(),
            texts.len()
        ))
        .into());
    }

    let hidden_size = hidden_width(&sequences)?;
    tracing::debug!(
        "Embedded {} texts (hidden={}, max_len={})",
        texts.len(),
        hidden_size,
        max_len
    );

    Ok(examples
        .iter()
        .zip(sequences.iter())
        .map(|(example, sequence)| {
            FeatureRecord::from_sequence(sequence, example.labels.clone(), max_len, hidden_size)
        })
        .collect())
}

/// The common vector width across all sequences.
fn hidden_width(sequences: &[Vec<Vec<f32>>]) -> Result<usize> {
    let mut width = None;
    for vector in sequences.iter().flatten() {
        match width {
            None => width = Some(vector.len()),
            Some(w) if w != vector.len() => {
                return Err(TrainError::ContractViolation(format!(
                    "embedding width changed from {} to {}",
                    w,
                    vector.len()
                ))
                .into());
            }
            Some(_) => {}
        }
    }
    match width {
        Some(w) if w > 0 => Ok(w),
        _ => Err(TrainError::ContractViolation(
            "embedding provider returned no vectors".to_string(),
        )
        .into()),
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::{kind_of, ErrorKind};
    use std::cell::Cell;

    /// Embeds each text as `len(words)` vectors of width 2: [pos, pos].
    struct WordEmbedder {
        calls: Cell<usize>,
        drop_last: bool,
    }

    impl WordEmbedder {
        fn new() -> Self {
            Self { calls: Cell::new(0), drop_last: false }
        }
    }

    impl EmbeddingProvider for WordEmbedder {
        fn id(&self) -> &str {
            "words"
        }

        fn embed(&self, texts: &[String]) -> Result<Vec<Vec<Vec<f32>>>> {
            self.calls.set(self.calls.get() + 1);
            let mut out: Vec<Vec<Vec<f32>>> = texts
                .iter()
                .map(|t| {
                    (0..t.split_whitespace().count())
                        .map(|p| vec![p as f32 + 1.0, p as f32 + 1.0])
                        .collect()
                })
                .collect();
            if self.drop_last {
                out.pop();
            }
            Ok(out)
        }
    }

    fn example(text: &str, labels: Vec<u8>) -> Example {
        Example { guid: "train-0".into(), text: text.into(), labels }
    }

    #[test]
    fn test_padding_mask_has_k_ones() {
        let seq = vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]];
        let rec = FeatureRecord::from_sequence(&seq, vec![1, 0], 5, 2);
        assert_eq!(rec.input_mask, vec![1, 1, 1, 0, 0]);
        assert_eq!(rec.real_len(), 3);
        assert_eq!(rec.row(0), &[1.0, 2.0]);
        assert_eq!(rec.row(2), &[5.0, 6.0]);
        assert_eq!(rec.row(3), &[0.0, 0.0]);
        assert_eq!(rec.row(4), &[0.0, 0.0]);
    }

    #[test]
    fn test_exactly_max_len_fills_every_row() {
        let seq: Vec<Vec<f32>> = (0..4).map(|i| vec![i as f32 + 1.0]).collect();
        let rec = FeatureRecord::from_sequence(&seq, vec![0], 4, 1);
        assert_eq!(rec.input_mask, vec![1, 1, 1, 1]);
        assert_eq!(rec.embeddings, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_one_over_max_len_is_truncated() {
        let seq: Vec<Vec<f32>> = (0..5).map(|i| vec![i as f32 + 1.0]).collect();
        let rec = FeatureRecord::from_sequence(&seq, vec![0], 4, 1);
        assert_eq!(rec.input_mask, vec![1, 1, 1, 1]);
        assert_eq!(rec.embeddings, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(rec.embeddings.len(), 4);
    }

    #[test]
    fn test_test_examples_have_zero_labels() {
        let rows = vec![
            DatasetRow { seq: "a b".into(), one_hot_labels: vec![1, 0, 0] },
            DatasetRow { seq: "c".into(),   one_hot_labels: vec![0, 1, 0] },
        ];
        let train = create_examples(&rows, 3, SetType::Train);
        let test  = create_examples(&rows, 3, SetType::Test);
        assert_eq!(train[1].labels, vec![0, 1, 0]);
        assert_eq!(train[1].guid, "train-1");
        assert!(test.iter().all(|e| e.labels == vec![0, 0, 0]));
        assert_eq!(test[0].guid, "test-0");
    }

    #[test]
    fn test_build_features_single_call_in_order() {
        let embedder = WordEmbedder::new();
        let examples = vec![
            example("one two three", vec![1, 0]),
            example("one", vec![0, 1]),
        ];
        let features = build_features(&examples, &embedder, 8).unwrap();
        assert_eq!(embedder.calls.get(), 1);
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].real_len(), 3);
        assert_eq!(features[1].real_len(), 1);
        assert_eq!(features[1].label_ids, vec![0, 1]);
        assert_eq!(features[0].hidden_size, 2);
    }

    #[test]
    fn test_size_mismatch_is_contract_violation() {
        let embedder = WordEmbedder { calls: Cell::new(0), drop_last: true };
        let examples = vec![example("a", vec![1]), example("b", vec![1])];
        let err = build_features(&examples, &embedder, 4).unwrap_err();
        assert_eq!(kind_of(&err), Some(ErrorKind::ContractViolation));
    }

    #[test]
    fn test_mixed_label_widths_rejected() {
        let embedder = WordEmbedder::new();
        let examples = vec![example("a", vec![1, 0]), example("b", vec![1])];
        let err = build_features(&examples, &embedder, 4).unwrap_err();
        assert_eq!(kind_of(&err), Some(ErrorKind::ContractViolation));
        assert_eq!(embedder.calls.get(), 0);
    }
}
