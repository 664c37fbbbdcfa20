// ============================================================
// Layer 4 — Train/Test Splitter
// ============================================================
// Draws round(N * train_ratio) rows for training with a fixed
// seed and keeps everything else as the held-out test set.
//
//   - Same rows + same ratio + same seed → same split, every run
//   - train ∪ test = rows, train ∩ test = ∅
//   - train rows come out in sampled order,
//     test rows keep their original order
//
// The test file doubles as the calibration holdout for the
// threshold refresh that follows training.
//
// Uses a seeded StdRng + SliceRandom::shuffle (Fisher-Yates).
//
// Reference: rand crate documentation (SeedableRng)

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::domain::error::TrainError;

/// The documented split seed.
pub const SPLIT_SEED: u64 = 42;

/// Split `rows` into (train, test) with the default seed.
pub fn split_train_test<T>(rows: Vec<T>, train_ratio: f64) -> Result<(Vec<T>, Vec<T>), TrainError> {
    split_train_test_seeded(rows, train_ratio, SPLIT_SEED)
}

pub fn split_train_test_seeded<T>(
    rows:        Vec<T>,
    train_ratio: f64,
    seed:        u64,
) -> Result<(Vec<T>, Vec<T>), TrainError> {
    if rows.is_empty() {
        return Err(TrainError::Data("no data found".to_string()));
    }
    if !(train_ratio > 0.0 && train_ratio <= 1.0) {
        return Err(TrainError::Configuration(format!(
            "train_ratio must be in (0, 1], got {train_ratio}"
        )));
    }

    let total    = rows.len();
    let train_n  = ((total as f64) * train_ratio).round() as usize;
    let train_n  = train_n.min(total);

    // Pick which row indices go to training
    let mut rng = StdRng::seed_from_u64(seed);
    let mut order: Vec<usize> = (0..total).collect();
    order.shuffle(&mut rng);
    order.truncate(train_n);

    let mut rank = vec![None; total];
    for (pos, &idx) in order.iter().enumerate() {
        rank[idx] = Some(pos);
    }

    let mut train: Vec<(usize, T)> = Vec::with_capacity(train_n);
    let mut test:  Vec<T>          = Vec::with_capacity(total - train_n);
    for (idx, row) in rows.into_iter().enumerate() {
        match rank[idx] {
            Some(pos) => train.push((pos, row)),
            None      => test.push(row),
        }
    }
    train.sort_by_key(|(pos, _)| *pos);
    let train: Vec<T> = train.into_iter().map(|(_, row)| row).collect();

    tracing::debug!(
        "Dataset split: {} train, {} test (ratio {}, seed {})",
        train.len(),
        test.len(),
        train_ratio,
        seed
    );

    Ok((train, test))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_correct_split_sizes() {
        let items: Vec<usize> = (0..100).collect();
        let (train, test) = split_train_test(items, 0.8).unwrap();
        assert_eq!(train.len(), 80);
        assert_eq!(test.len(), 20);
    }

    #[test]
    fn test_ten_rows_ninety_percent() {
        let items: Vec<usize> = (0..10).collect();
        let (train, test) = split_train_test(items, 0.9).unwrap();
        assert_eq!(train.len(), 9);
        assert_eq!(test.len(), 1);
    }

    #[test]
    fn test_same_seed_same_split() {
        let items: Vec<usize> = (0..57).collect();
        let a = split_train_test(items.clone(), 0.7).unwrap();
        let b = split_train_test(items, 0.7).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_partitions_disjoint_and_complete() {
        let items: Vec<usize> = (0..50).collect();
        let (train, test) = split_train_test(items, 0.7).unwrap();
        assert_eq!(train.len() + test.len(), 50);

        let train_set: HashSet<_> = train.iter().copied().collect();
        let test_set:  HashSet<_> = test.iter().copied().collect();
        assert!(train_set.is_disjoint(&test_set));
        assert_eq!(train_set.union(&test_set).count(), 50);
    }

    #[test]
    fn test_test_side_keeps_input_order() {
        let items: Vec<usize> = (0..30).collect();
        let (_, test) = split_train_test(items, 0.5).unwrap();
        assert!(test.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_full_training_split() {
        let items: Vec<usize> = (0..10).collect();
        let (train, test) = split_train_test(items, 1.0).unwrap();
        assert_eq!(train.len(), 10);
        assert!(test.is_empty());
    }

    #[test]
    fn test_empty_dataset_is_data_error() {
        let items: Vec<usize> = Vec::new();
        let err = split_train_test(items, 0.8).unwrap_err();
        assert!(matches!(err, TrainError::Data(_)));
    }

    #[test]
    fn test_bad_ratio_rejected() {
        let items: Vec<usize> = (0..10).collect();
        assert!(split_train_test(items.clone(), 0.0).is_err());
        assert!(split_train_test(items, 1.5).is_err());
    }
}
