// ============================================================
// Layer 4 — Sample Snapshot
// ============================================================
// Reads labeled samples for one model and turns them into
// DatasetRows (text + multi-hot labels) in memory.
//
// All sample reads and writes in the process go through one
// lock, SAMPLE_LOCK. The snapshot holds it only for the query
// and the copy into memory, so concurrent runs never observe a
// half-updated sample set, while the long training phase that
// follows runs unlocked.
//
//   lock ─▶ query store ─▶ encode labels ─▶ unlock ─▶ (training...)

use anyhow::Result;
use std::sync::{Mutex, MutexGuard};

use crate::domain::error::TrainError;
use crate::domain::sample::DatasetRow;
use crate::domain::traits::SampleStore;
use crate::domain::vocabulary::Vocabulary;

static SAMPLE_LOCK: Mutex<()> = Mutex::new(());

/// Acquire the process-wide sample lock. Writers to the sample
/// store take this too.
pub fn sample_lock() -> MutexGuard<'static, ()> {
    // The guarded value is (), so a poisoned lock carries no bad state
    SAMPLE_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Capture up to `limit` training rows for `model`.
///
/// Fails with a data error when the store has nothing for the model
/// or a sample carries a topic missing from `vocab`.
pub fn capture_training_rows(
    store: &dyn SampleStore,
    model: &str,
    limit: usize,
    vocab: &Vocabulary,
) -> Result<Vec<DatasetRow>> {
    let rows = {
        let _guard = sample_lock();
        let samples = store.training_samples(model, limit)?;
        samples
            .iter()
            .map(|s| {
                let one_hot_labels = vocab
                    .one_hot(&s.distinct_topics())
                    .map_err(|e| TrainError::Data(format!("sample '{}': {e}", s.seq)))?;
                Ok(DatasetRow { seq: s.seq.clone(), one_hot_labels })
            })
            .collect::<Result<Vec<_>, TrainError>>()?
    };

    if rows.is_empty() {
        return Err(TrainError::Data(format!("no data found for model '{model}'")).into());
    }

    tracing::info!("Captured {} training samples for '{}'", rows.len(), model);
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::{kind_of, ErrorKind};
    use crate::domain::sample::LabeledSample;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct FixedStore(Vec<LabeledSample>);

    impl SampleStore for FixedStore {
        fn training_samples(&self, _model: &str, limit: usize) -> Result<Vec<LabeledSample>> {
            Ok(self.0.iter().take(limit).cloned().collect())
        }
    }

    #[test]
    fn test_rows_are_multi_hot() {
        let vocab = Vocabulary::new(["a", "b", "c"]);
        let store = FixedStore(vec![
            LabeledSample::new("one", ["a", "c", "a"]),
            LabeledSample::new("two", ["b"]),
        ]);
        let rows = capture_training_rows(&store, "m", 10, &vocab).unwrap();
        assert_eq!(rows[0].one_hot_labels, vec![1, 0, 1, 0]);
        assert_eq!(rows[1].one_hot_labels, vec![0, 1, 0, 0]);
    }

    #[test]
    fn test_limit_respected() {
        let vocab = Vocabulary::new(["a"]);
        let store = FixedStore((0..5).map(|i| LabeledSample::new(format!("s{i}"), ["a"])).collect());
        let rows = capture_training_rows(&store, "m", 3, &vocab).unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn test_empty_store_is_data_error() {
        let vocab = Vocabulary::new(["a"]);
        let err = capture_training_rows(&FixedStore(Vec::new()), "m", 10, &vocab).unwrap_err();
        assert_eq!(kind_of(&err), Some(ErrorKind::Data));
    }

    /// A store that checks it is never queried concurrently.
    struct ExclusiveStore {
        busy: Arc<AtomicBool>,
    }

    impl SampleStore for ExclusiveStore {
        fn training_samples(&self, _model: &str, _limit: usize) -> Result<Vec<LabeledSample>> {
            assert!(!self.busy.swap(true, Ordering::SeqCst), "concurrent sample read");
            std::thread::sleep(std::time::Duration::from_millis(5));
            self.busy.store(false, Ordering::SeqCst);
            Ok(vec![LabeledSample::new("x", ["a"])])
        }
    }

    #[test]
    fn test_reads_are_serialized() {
        let busy = Arc::new(AtomicBool::new(false));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let busy = busy.clone();
                std::thread::spawn(move || {
                    let vocab = Vocabulary::new(["a"]);
                    capture_training_rows(&ExclusiveStore { busy }, "m", 1, &vocab).map(|r| r.len())
                })
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap().unwrap(), 1);
        }
    }
}
