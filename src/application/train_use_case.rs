// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Drives one training run from labeled samples to a promoted,
// calibrated model instance:
//
//   Step 1: Resolve the instance id         (Layer 6 - infra)
//   Step 2: Snapshot samples under lock     (Layer 4 - data)
//   Step 3: Materialize instance + config   (Layer 6 - infra)
//   Step 4: Split train/test, write CSVs    (Layer 4 - data)
//   Step 5: Embed + pad train examples      (Layer 4 - data)
//   Step 6: Run the training job            (Layer 5 - ml)
//   Step 7: Export a servable model         (Layer 5 - ml)
//   Step 8: Promote the newest export       (Layer 6 - infra)
//   Step 9: Hand off to threshold refresh   (collaborator)
//
// Any failure aborts the run. Nothing is retried and nothing
// written so far is cleaned up.
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::data::{
    dataset::TopicDataset,
    features::{build_features, create_examples, DEFAULT_MAX_SEQ_LEN},
    snapshot::capture_training_rows,
    split_file::write_text_column,
    splitter::split_train_test,
};
use crate::domain::error::TrainError;
use crate::domain::sample::{DatasetRow, SetType};
use crate::domain::traits::{Classifier, ClassifierLoader, EmbeddingProvider, SampleStore};
use crate::domain::vocabulary::Vocabulary;
use crate::infra::{
    checkpoint::CheckpointManager,
    instance_store::{InstanceConfig, InstanceStore},
};
use crate::ml::{export::export_servable, trainer::run_training};

pub const RUN_DESCRIPTION: &str = "From TrainUseCase::execute";

/// Checkpoints are written at most this many steps apart.
pub const MAX_CHECKPOINT_INTERVAL: usize = 500;

// ─── Training Configuration ──────────────────────────────────────────────────
// All knobs for a training run. Saved as train/train_config.json
// next to the checkpoints so a run can be inspected afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub learning_rate:    f64,
    pub num_warmup_steps: usize,
    pub dropout:          f64,
    /// Width of the shared attention projection (0 = none)
    pub shared_size:      usize,
    pub batch_size:       usize,
    pub num_train_steps:  usize,
    pub train_ratio:      f64,
    /// Maximum number of samples read for the run
    pub limit:            usize,
    pub max_seq_len:      usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            learning_rate:    0.02,
            num_warmup_steps: 100,
            dropout:          0.1,
            shared_size:      0,
            batch_size:       256,
            num_train_steps:  1000,
            train_ratio:      0.9,
            limit:            2000,
            max_seq_len:      DEFAULT_MAX_SEQ_LEN,
        }
    }
}

impl TrainConfig {
    pub fn checkpoint_every(&self) -> usize {
        self.num_train_steps.min(MAX_CHECKPOINT_INTERVAL)
    }

    pub fn validate(&self) -> Result<(), TrainError> {
        let problem = if !(self.train_ratio > 0.0 && self.train_ratio <= 1.0) {
            Some(format!("train_ratio must be in (0, 1], got {}", self.train_ratio))
        } else if self.num_train_steps == 0 {
            Some("num_train_steps must be positive".to_string())
        } else if self.batch_size == 0 {
            Some("batch_size must be positive".to_string())
        } else if self.max_seq_len == 0 {
            Some("max_seq_len must be positive".to_string())
        } else if !(0.0..1.0).contains(&self.dropout) {
            Some(format!("dropout must be in [0, 1), got {}", self.dropout))
        } else {
            None
        };
        match problem {
            Some(msg) => Err(TrainError::Configuration(msg)),
            None => Ok(()),
        }
    }
}

// ─── Collaborators ────────────────────────────────────────────────────────────
/// The external systems one run talks to.
pub struct TrainCollaborators<'a> {
    pub embedder:    &'a dyn EmbeddingProvider,
    pub samples:     &'a dyn SampleStore,
    pub classifiers: &'a dyn ClassifierLoader,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    store:  InstanceStore,
    config: TrainConfig,
}

impl TrainUseCase {
    /// Fails before any run starts when `base_dir` is not a directory
    /// or the config is invalid.
    pub fn new(base_dir: &Path, model_name: &str, config: TrainConfig) -> Result<Self> {
        config.validate()?;
        let store = InstanceStore::new(base_dir, model_name)?;
        Ok(Self { store, config })
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    pub fn store(&self) -> &InstanceStore {
        &self.store
    }

    /// Run the full pipeline and return a classifier bound to the
    /// new instance, with thresholds refreshed on the test split.
    pub fn execute(
        &self,
        collab:          &TrainCollaborators<'_>,
        vocab:           &Vocabulary,
        forced_instance: Option<&str>,
    ) -> Result<Box<dyn Classifier>> {
        let cfg   = &self.config;
        let model = self.store.model_name();

        // ── Step 1: Resolve the instance id ───────────────────────────────────
        let instance = self.store.allocate(forced_instance)?;
        if instance.exists() {
            return Err(TrainError::Configuration(format!(
                "instance already exists: {}",
                instance.root().display()
            ))
            .into());
        }
        tracing::info!("Training '{}' as instance {}", model, instance.id());

        // ── Step 2: Snapshot samples (the only locked phase) ──────────────────
        let rows = capture_training_rows(collab.samples, model, cfg.limit, vocab)?;

        // ── Step 3: Materialize the instance ──────────────────────────────────
        instance.materialize()?;
        instance.write_vocabulary(vocab)?;
        instance.write_config(&InstanceConfig::unreleased(collab.embedder.id(), RUN_DESCRIPTION))?;

        // ── Step 4: Split and persist ─────────────────────────────────────────
        let (train_rows, test_rows) = split_train_test(rows, cfg.train_ratio)?;
        write_text_column(&instance.train_split_path(), &texts_of(&train_rows))?;
        write_text_column(&instance.test_split_path(), &texts_of(&test_rows))?;
        tracing::info!("Split: {} train, {} test", train_rows.len(), test_rows.len());

        // ── Step 5: Features for the train split ──────────────────────────────
        let examples = create_examples(&train_rows, vocab.len(), SetType::Train);
        let records  = build_features(&examples, collab.embedder, cfg.max_seq_len)
            .context("Failed to build training features")?;

        // ── Step 6: Train ─────────────────────────────────────────────────────
        let ckpt = CheckpointManager::new(instance.train_dir())?;
        ckpt.save_config(cfg)?;
        let trained = run_training(cfg, TopicDataset::new(records), &ckpt)?;

        // ── Step 7: Export ────────────────────────────────────────────────────
        let export_dir = export_servable(&trained, &instance.saved_models_dir())?;
        tracing::debug!("Exported to '{}'", export_dir.display());

        // ── Step 8: Promote ───────────────────────────────────────────────────
        instance.promote()?;

        // ── Step 9: Threshold refresh handoff ─────────────────────────────────
        let mut classifier = collab
            .classifiers
            .load(self.store.base_dir(), model, instance.id())
            .with_context(|| format!("Cannot open trained instance {}", instance.id()))?;
        classifier.refresh_thresholds(cfg.limit, &instance.test_split_path())?;

        tracing::info!("Instance {} of '{}' is ready", instance.id(), model);
        Ok(classifier)
    }
}

fn texts_of(rows: &[DatasetRow]) -> Vec<&str> {
    rows.iter().map(|r| r.seq.as_str()).collect()
}
