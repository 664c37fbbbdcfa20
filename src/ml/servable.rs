// ============================================================
// Layer 5 — Servable Model
// ============================================================
// Loads an exported (or promoted) model directory back into
// memory and scores feature records with it.
use anyhow::{Context, Result};
use burn::{
    backend::ndarray::NdArrayDevice,
    prelude::*,
    record::Recorder,
};
use std::path::Path;

use crate::data::batcher::TopicBatcher;
use crate::data::features::FeatureRecord;
use crate::ml::export::{WeightsRecorder, MODEL_CONFIG_FILE, WEIGHTS_STEM};
use crate::ml::model::{ClassAttentionConfig, ClassAttentionModel};
use crate::ml::trainer::InferBackend;
use burn::data::dataloader::batcher::Batcher;

pub struct ServableModel {
    model:  ClassAttentionModel<InferBackend>,
    config: ClassAttentionConfig,
    device: NdArrayDevice,
}

impl ServableModel {
    /// Load from a directory holding model_config.json and model.mpk.gz.
    pub fn load(dir: &Path) -> Result<Self> {
        let device = NdArrayDevice::default();

        let config_path = dir.join(MODEL_CONFIG_FILE);
        let mut config = ClassAttentionConfig::load(&config_path)
            .map_err(|e| anyhow::anyhow!("Cannot read '{}': {e:?}", config_path.display()))?;
        config.dropout = 0.0;

        let model: ClassAttentionModel<InferBackend> = config.init(&device);
        let weights = dir.join(WEIGHTS_STEM);
        let record = WeightsRecorder::new()
            .load(weights.clone(), &device)
            .map_err(|e| anyhow::anyhow!("{e:?}"))
            .with_context(|| format!("Cannot load weights from '{}'", weights.display()))?;

        tracing::info!("Servable model loaded from '{}'", dir.display());
        Ok(Self { model: model.load_record(record), config, device })
    }

    pub fn num_classes(&self) -> usize {
        self.config.num_classes
    }

    pub fn hidden_size(&self) -> usize {
        self.config.hidden_size
    }

    /// Per-class probabilities, one row per record.
    pub fn score(&self, records: &[FeatureRecord]) -> Result<Vec<Vec<f32>>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(bad) = records.iter().find(|r| r.hidden_size != self.config.hidden_size) {
            anyhow::bail!(
                "record hidden size {} does not match model hidden size {}",
                bad.hidden_size,
                self.config.hidden_size
            );
        }

        let batch = TopicBatcher::<InferBackend>::new(self.device.clone()).batch(records.to_vec());
        let probs: Vec<f32> = self
            .model
            .predict(batch.embeddings, batch.input_mask)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("Cannot read probabilities: {e:?}"))?;

        Ok(probs
            .chunks(self.config.num_classes)
            .map(|row| row.to_vec())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::export::export_servable;
    use crate::ml::trainer::TrainedModel;
    use tempfile::tempdir;

    #[test]
    fn test_load_exported_and_score() {
        let dir    = tempdir().unwrap();
        let config = ClassAttentionConfig::new(2, 3).with_dropout(0.0);
        let model  = config.init::<InferBackend>(&Default::default());
        let out    = export_servable(&TrainedModel { model, config, steps: 0 }, dir.path()).unwrap();

        let servable = ServableModel::load(&out).unwrap();
        assert_eq!(servable.num_classes(), 3);
        assert_eq!(servable.hidden_size(), 2);

        let rec = FeatureRecord::from_sequence(&[vec![0.5, -0.5]], vec![0, 0, 0], 4, 2);
        let scores = servable.score(&[rec.clone(), rec]).unwrap();
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0].len(), 3);
        assert!(scores[0].iter().all(|p| (0.0..=1.0).contains(p)));
        assert_eq!(scores[0], scores[1]);
    }

    #[test]
    fn test_missing_dir_fails() {
        let dir = tempdir().unwrap();
        assert!(ServableModel::load(&dir.path().join("nope")).is_err());
    }
}
