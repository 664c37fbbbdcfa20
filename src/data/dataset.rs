// ============================================================
// Layer 4 — Topic Dataset
// ============================================================
// Feature records held in memory and handed to burn's
// DataLoader, which shuffles and batches them per pass.

use burn::data::dataset::Dataset;

use crate::data::features::FeatureRecord;

/// In-memory feature records exposed through burn's Dataset trait.
pub struct TopicDataset {
    records: Vec<FeatureRecord>,
}

impl TopicDataset {
    pub fn new(records: Vec<FeatureRecord>) -> Self { Self { records } }

    pub fn record_count(&self) -> usize { self.records.len() }

    /// Hidden width shared by every record (0 when empty)
    pub fn hidden_size(&self) -> usize {
        self.records.first().map(|r| r.hidden_size).unwrap_or(0)
    }

    pub fn num_classes(&self) -> usize {
        self.records.first().map(|r| r.num_classes()).unwrap_or(0)
    }
}

impl Dataset<FeatureRecord> for TopicDataset {
    fn get(&self, index: usize) -> Option<FeatureRecord> {
        self.records.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}
