// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves training checkpoints into an instance's train/ directory
// with the same gzipped recorder as the servable export.
//
// File naming convention:
//   train/
//     train_config.json      ← effective TrainConfig for the run
//     model_step_500.mpk.gz  ← weights after step 500
//     model_step_1000.mpk.gz
//     latest_step.json       ← number of the latest saved step
//     metrics.csv            ← see metrics.rs
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};
use burn::{
    prelude::*,
    record::Recorder,
};

use crate::application::train_use_case::TrainConfig;
use crate::domain::error::TrainError;
use crate::ml::export::WeightsRecorder;
use crate::ml::model::ClassAttentionModel;

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create a CheckpointManager, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| TrainError::io(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save model weights for a given step and move the latest pointer.
    pub fn save_model<B: Backend>(&self, model: &ClassAttentionModel<B>, step: usize) -> Result<()> {
        let path = self.dir.join(format!("model_step_{step}"));

        WeightsRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .map_err(|e| anyhow::anyhow!("{e:?}"))
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        let latest_path = self.dir.join("latest_step.json");
        fs::write(&latest_path, serde_json::to_string(&step)?)
            .map_err(|e| TrainError::io(&latest_path, e))?;

        tracing::debug!("Saved checkpoint: step {}", step);
        Ok(())
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join("train_config.json");
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json).map_err(|e| TrainError::io(&path, e))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join("train_config.json");
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read config from '{}'", path.display()))?;
        Ok(serde_json::from_str(&json)?)
    }

    /// The most recent checkpointed step, if any.
    pub fn latest_step(&self) -> Result<Option<usize>> {
        let path = self.dir.join("latest_step.json");
        if !path.exists() {
            return Ok(None);
        }
        let s = fs::read_to_string(&path).map_err(|e| TrainError::io(&path, e))?;
        Ok(Some(serde_json::from_str::<usize>(&s)?))
    }
}
