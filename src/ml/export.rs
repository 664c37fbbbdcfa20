// ============================================================
// Layer 5 — Servable Export
// ============================================================
// Writes a trained model as a self-describing directory under
// the export root, named by the export time in whole seconds:
//
//   saved_models/
//     1700000000/
//       model.mpk.gz           ← weights (WeightsRecorder)
//       model_config.json      ← ClassAttentionConfig
//       serving_signature.json ← input/output contract
//
// The serving contract: embeddings [batch, time, D] float32 and
// input_mask [batch, time] int32 in, probabilities
// [batch, num_classes] out. -1 marks a free dimension.

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use crate::domain::error::TrainError;
use crate::ml::trainer::TrainedModel;

pub const WEIGHTS_STEM:     &str = "model";
pub const MODEL_CONFIG_FILE: &str = "model_config.json";
pub const SIGNATURE_FILE:   &str = "serving_signature.json";

/// Gzipped MessagePack at full precision; appends `.mpk.gz` to the
/// path it is given. Checkpoints and exports both use it.
pub type WeightsRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorSpec {
    pub name:  String,
    pub dtype: String,
    pub shape: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServingSignature {
    pub inputs:  Vec<TensorSpec>,
    pub outputs: Vec<TensorSpec>,
}

impl ServingSignature {
    pub fn for_model(hidden_size: usize, num_classes: usize) -> Self {
        Self {
            inputs: vec![
                TensorSpec {
                    name:  "embeddings".into(),
                    dtype: "float32".into(),
                    shape: vec![-1, -1, hidden_size as i64],
                },
                TensorSpec {
                    name:  "input_mask".into(),
                    dtype: "int32".into(),
                    shape: vec![-1, -1],
                },
            ],
            outputs: vec![TensorSpec {
                name:  "probabilities".into(),
                dtype: "float32".into(),
                shape: vec![-1, num_classes as i64],
            }],
        }
    }
}

/// Export `trained` under a fresh time-stamped directory of
/// `export_root` and return that directory.
pub fn export_servable(trained: &TrainedModel, export_root: &Path) -> Result<PathBuf> {
    fs::create_dir_all(export_root).map_err(|e| TrainError::io(export_root, e))?;

    let export_dir = fresh_export_dir(export_root)?;
    fs::create_dir(&export_dir).map_err(|e| TrainError::io(&export_dir, e))?;

    let weights = export_dir.join(WEIGHTS_STEM);
    WeightsRecorder::new()
        .record(trained.model.clone().into_record(), weights.clone())
        .map_err(|e| TrainError::Export(format!("cannot write '{}': {e:?}", weights.display())))?;

    let config_path = export_dir.join(MODEL_CONFIG_FILE);
    trained
        .config
        .save(&config_path)
        .map_err(|e| TrainError::io(&config_path, e))?;

    let signature = ServingSignature::for_model(trained.config.hidden_size, trained.config.num_classes);
    let sig_path  = export_dir.join(SIGNATURE_FILE);
    fs::write(&sig_path, serde_json::to_string_pretty(&signature)?)
        .with_context(|| format!("Cannot write serving signature to '{}'", sig_path.display()))?;

    tracing::info!("Exported servable model to '{}'", export_dir.display());
    Ok(export_dir)
}

/// `export_root/<unix seconds>`, bumped forward if that name is taken.
fn fresh_export_dir(export_root: &Path) -> Result<PathBuf> {
    let mut secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("System clock is before the Unix epoch")?
        .as_secs();
    loop {
        let candidate = export_root.join(secs.to_string());
        if !candidate.exists() {
            return Ok(candidate);
        }
        secs += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::ClassAttentionConfig;
    use crate::ml::trainer::InferBackend;
    use tempfile::tempdir;

    fn tiny_model() -> TrainedModel {
        let config = ClassAttentionConfig::new(4, 3);
        let model  = config.init::<InferBackend>(&Default::default());
        TrainedModel { model, config, steps: 0 }
    }

    #[test]
    fn test_export_writes_three_artifacts() {
        let dir = tempdir().unwrap();
        let out = export_servable(&tiny_model(), &dir.path().join("saved_models")).unwrap();

        assert!(out.join("model.mpk.gz").is_file());
        assert!(out.join(MODEL_CONFIG_FILE).is_file());

        let sig: ServingSignature =
            serde_json::from_str(&fs::read_to_string(out.join(SIGNATURE_FILE)).unwrap()).unwrap();
        assert_eq!(sig.inputs[0].name, "embeddings");
        assert_eq!(sig.inputs[0].shape, vec![-1, -1, 4]);
        assert_eq!(sig.inputs[1].name, "input_mask");
        assert_eq!(sig.outputs[0].shape, vec![-1, 3]);
    }

    #[test]
    fn test_two_exports_get_distinct_dirs() {
        let dir   = tempdir().unwrap();
        let root  = dir.path().join("saved_models");
        let model = tiny_model();
        let a = export_servable(&model, &root).unwrap();
        let b = export_servable(&model, &root).unwrap();
        assert_ne!(a, b);
    }
}
