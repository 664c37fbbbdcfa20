// ============================================================
// Layer 6 — Filesystem Classifier
// ============================================================
// A Classifier backed by a promoted instance directory, and the
// ClassifierLoader that finds instances under a base directory.
//
// "Released" means: the greatest instance id whose config.json
// has is_released = true.
//
// Threshold refresh here is a load check: it reads the holdout
// split, loads the promoted model, fails if its class count
// differs from the vocabulary, and resets one decision threshold
// per label. Nothing is scored; calibration belongs to the
// serving side.

use anyhow::{Context, Result};
use std::{fmt, path::Path};

use crate::data::split_file::read_text_column;
use crate::domain::error::TrainError;
use crate::domain::traits::{Classifier, ClassifierLoader};
use crate::domain::vocabulary::Vocabulary;
use crate::infra::instance_store::{InstanceConfig, InstanceStore, ModelInstance};
use crate::ml::servable::ServableModel;

pub const DEFAULT_THRESHOLD: f32 = 0.5;

pub struct InstanceClassifier {
    instance:   ModelInstance,
    config:     InstanceConfig,
    vocab:      Vocabulary,
    thresholds: Vec<f32>,
    holdout:    usize,
}

impl InstanceClassifier {
    pub fn open(instance: ModelInstance) -> Result<Self> {
        if !instance.exists() {
            return Err(TrainError::Configuration(format!(
                "no instance at '{}'",
                instance.root().display()
            ))
            .into());
        }
        let config = instance.read_config()?;
        let vocab  = instance.read_vocabulary()?;
        let thresholds = vec![DEFAULT_THRESHOLD; vocab.len()];
        Ok(Self { instance, config, vocab, thresholds, holdout: 0 })
    }

    pub fn config(&self) -> &InstanceConfig {
        &self.config
    }

    pub fn thresholds(&self) -> &[f32] {
        &self.thresholds
    }

    /// Holdout rows seen by the last threshold refresh.
    pub fn holdout_size(&self) -> usize {
        self.holdout
    }
}

impl fmt::Display for InstanceClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.instance.model_name(), self.instance.id())
    }
}

impl Classifier for InstanceClassifier {
    fn model_name(&self) -> &str {
        self.instance.model_name()
    }

    fn instance_id(&self) -> &str {
        self.instance.id()
    }

    fn embedding_id(&self) -> &str {
        &self.config.bert
    }

    fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    fn refresh_thresholds(&mut self, limit: usize, subset_file: &Path) -> Result<()> {
        let mut holdout = read_text_column(subset_file)?;
        holdout.truncate(limit);

        let servable = ServableModel::load(self.instance.root())
            .with_context(|| format!("Instance {self} has no loadable model"))?;
        if servable.num_classes() != self.vocab.len() {
            return Err(TrainError::ContractViolation(format!(
                "model has {} classes, vocabulary has {}",
                servable.num_classes(),
                self.vocab.len()
            ))
            .into());
        }

        self.thresholds = vec![DEFAULT_THRESHOLD; self.vocab.len()];
        self.holdout = holdout.len();
        tracing::info!(
            "Refreshed thresholds for {} against {} holdout rows from '{}'",
            self,
            self.holdout,
            subset_file.display()
        );
        Ok(())
    }
}

// ─── Loader ───────────────────────────────────────────────────────────────────
#[derive(Debug, Default, Clone, Copy)]
pub struct FsClassifierLoader;

impl FsClassifierLoader {
    /// Id of the released instance, if any.
    pub fn released_id(store: &InstanceStore) -> Result<Option<String>> {
        let mut released = None;
        for id in store.list_instances()? {
            let instance = store.instance(&id);
            // Directories without a config are runs that never got going
            if !instance.config_path().is_file() {
                continue;
            }
            if instance.read_config()?.is_released {
                released = Some(id);
            }
        }
        Ok(released)
    }
}

impl ClassifierLoader for FsClassifierLoader {
    fn load(&self, base_dir: &Path, model_name: &str, instance_id: &str) -> Result<Box<dyn Classifier>> {
        let store = InstanceStore::new(base_dir, model_name)?;
        Ok(Box::new(InstanceClassifier::open(store.instance(instance_id))?))
    }

    fn load_released(&self, base_dir: &Path, model_name: &str) -> Result<Box<dyn Classifier>> {
        let store = InstanceStore::new(base_dir, model_name)?;
        let id = Self::released_id(&store)?.ok_or_else(|| {
            TrainError::Configuration(format!(
                "no released instance of '{}' under '{}'",
                model_name,
                base_dir.display()
            ))
        })?;
        tracing::debug!("Released instance of '{}' is {}", model_name, id);
        Ok(Box::new(InstanceClassifier::open(store.instance(&id))?))
    }
}
