// ============================================================
// Layer 6 — Instance Store
// ============================================================
// Every training run produces one model instance: a directory
// named by a timestamp under the model's directory.
//
//   base_dir/
//     model_name/
//       1700000000/                ← one instance
//         label.vocab              ← one label per line, index order
//         config.json              ← bert, vocab, is_released, ...
//         train_seqs.csv           ← training split (text column)
//         test_seqs.csv            ← held-out split (text column)
//         train/                   ← checkpoints, metrics
//           saved_models/
//             1700000123/          ← one export attempt
//         model.mpk.gz ...         ← promoted export, copied flat
//
// Lifecycle of a ModelInstance:
//   allocate()     → id resolved, nothing on disk yet
//   materialize()  → directories created, exactly once
//   write_*()      → vocabulary, config, split files
//   promote()      → newest export copied into the root;
//                    the instance is complete from here on
//
// Nothing in this module deletes an instance.
//
// Reference: Rust Book §9 (Error Handling)
//            Rust Book §12 (I/O and File Handling)

use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use crate::domain::error::TrainError;
use crate::domain::vocabulary::Vocabulary;

pub const VOCAB_FILE:       &str = "label.vocab";
pub const CONFIG_FILE:      &str = "config.json";
pub const TRAIN_SPLIT_FILE: &str = "train_seqs.csv";
pub const TEST_SPLIT_FILE:  &str = "test_seqs.csv";
pub const TRAIN_DIR:        &str = "train";
pub const SAVED_MODELS_DIR: &str = "saved_models";

// ─── config.json ──────────────────────────────────────────────────────────────
/// Declarative description of an instance, as stored in config.json.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceConfig {
    /// Embedding-service identifier
    pub bert: String,
    pub vocab: String,
    pub is_released: bool,
    /// File name of the held-out split used for calibration
    pub training_subset_path: String,
    #[serde(default)]
    pub description: String,
}

impl InstanceConfig {
    /// Config for a freshly trained, unreleased instance.
    pub fn unreleased(bert: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            bert:                 bert.into(),
            vocab:                VOCAB_FILE.to_string(),
            is_released:          false,
            training_subset_path: TEST_SPLIT_FILE.to_string(),
            description:          description.into(),
        }
    }
}

// ─── InstanceStore ────────────────────────────────────────────────────────────
/// All instances of one model under one base directory.
#[derive(Debug, Clone)]
pub struct InstanceStore {
    base_dir:   PathBuf,
    model_name: String,
}

impl InstanceStore {
    /// Fails when `base_dir` is not an existing directory.
    pub fn new(base_dir: impl Into<PathBuf>, model_name: impl Into<String>) -> Result<Self, TrainError> {
        let base_dir = base_dir.into();
        if !base_dir.is_dir() {
            return Err(TrainError::Configuration(format!(
                "invalid base classifier dir: {}",
                base_dir.display()
            )));
        }
        let model_name = model_name.into();
        validate_component("model name", &model_name)?;
        Ok(Self { base_dir, model_name })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn model_dir(&self) -> PathBuf {
        self.base_dir.join(&self.model_name)
    }

    /// Resolve the id for a new run: the caller's forced id, or the
    /// current time in whole seconds. Touches nothing on disk.
    pub fn allocate(&self, forced_instance: Option<&str>) -> Result<ModelInstance, TrainError> {
        let id = match forced_instance {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => timestamp_id()?,
        };
        validate_component("instance id", &id)?;
        Ok(self.instance(&id))
    }

    /// Handle to an instance by id (it may or may not exist).
    pub fn instance(&self, id: &str) -> ModelInstance {
        ModelInstance {
            model_name: self.model_name.clone(),
            id:         id.to_string(),
            root:       self.model_dir().join(id),
        }
    }

    /// Ids of every instance directory, sorted ascending.
    pub fn list_instances(&self) -> Result<Vec<String>, TrainError> {
        let dir = self.model_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut ids = subdirectory_names(&dir)?;
        ids.sort();
        Ok(ids)
    }
}

/// Current Unix time in whole seconds, as an instance id.
pub fn timestamp_id() -> Result<String, TrainError> {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| TrainError::Configuration(format!("system clock before Unix epoch: {e}")))?
        .as_secs();
    Ok(secs.to_string())
}

fn validate_component(what: &str, value: &str) -> Result<(), TrainError> {
    let bad = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\']);
    if bad {
        return Err(TrainError::Configuration(format!("invalid {what}: '{value}'")));
    }
    Ok(())
}

// ─── ModelInstance ────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInstance {
    model_name: String,
    id:         String,
    root:       PathBuf,
}

impl ModelInstance {
    pub fn model_name(&self) -> &str { &self.model_name }
    pub fn id(&self) -> &str { &self.id }
    pub fn root(&self) -> &Path { &self.root }

    pub fn vocab_path(&self) -> PathBuf { self.root.join(VOCAB_FILE) }
    pub fn config_path(&self) -> PathBuf { self.root.join(CONFIG_FILE) }
    pub fn train_split_path(&self) -> PathBuf { self.root.join(TRAIN_SPLIT_FILE) }
    pub fn test_split_path(&self) -> PathBuf { self.root.join(TEST_SPLIT_FILE) }
    pub fn train_dir(&self) -> PathBuf { self.root.join(TRAIN_DIR) }
    pub fn saved_models_dir(&self) -> PathBuf { self.train_dir().join(SAVED_MODELS_DIR) }

    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    /// Create the instance directory and its train/ subtree.
    /// An instance that already exists is never reused.
    pub fn materialize(&self) -> Result<(), TrainError> {
        if self.root.exists() {
            return Err(TrainError::Configuration(format!(
                "instance already exists: {}",
                self.root.display()
            )));
        }
        if let Some(model_dir) = self.root.parent() {
            fs::create_dir_all(model_dir).map_err(|e| TrainError::io(model_dir, e))?;
        }
        // create_dir (not _all) so a concurrent run with the same id loses
        fs::create_dir(&self.root).map_err(|e| TrainError::io(&self.root, e))?;
        let train_dir = self.train_dir();
        fs::create_dir(&train_dir).map_err(|e| TrainError::io(&train_dir, e))?;

        tracing::info!("Created instance '{}'", self.root.display());
        Ok(())
    }

    pub fn write_vocabulary(&self, vocab: &Vocabulary) -> Result<(), TrainError> {
        let path = self.vocab_path();
        fs::write(&path, vocab.to_lines()).map_err(|e| TrainError::io(&path, e))
    }

    pub fn read_vocabulary(&self) -> Result<Vocabulary, TrainError> {
        let path = self.vocab_path();
        let text = fs::read_to_string(&path).map_err(|e| TrainError::io(&path, e))?;
        Ok(Vocabulary::from_lines(&text))
    }

    pub fn write_config(&self, config: &InstanceConfig) -> Result<(), TrainError> {
        let path = self.config_path();
        let json = serde_json::to_string(config)
            .map_err(|e| TrainError::io(&path, e.into()))?;
        fs::write(&path, json).map_err(|e| TrainError::io(&path, e))
    }

    pub fn read_config(&self) -> Result<InstanceConfig, TrainError> {
        let path = self.config_path();
        let text = fs::read_to_string(&path).map_err(|e| TrainError::io(&path, e))?;
        serde_json::from_str(&text).map_err(|e| TrainError::io(&path, e.into()))
    }

    /// Copy the newest export into the instance root and return the
    /// export that was promoted.
    ///
    /// "Newest" is the lexicographically greatest directory name
    /// under saved_models/. Same-named files in the root are
    /// overwritten.
    pub fn promote(&self) -> Result<PathBuf, TrainError> {
        let saved = self.saved_models_dir();
        if !saved.is_dir() {
            return Err(TrainError::Export(format!(
                "no export directory at {}",
                saved.display()
            )));
        }

        let newest = subdirectory_names(&saved)?
            .into_iter()
            .max()
            .ok_or_else(|| TrainError::Export(format!("no exports under {}", saved.display())))?;

        let source = saved.join(&newest);
        copy_tree(&source, &self.root)?;

        tracing::info!("Promoted export '{}' into '{}'", newest, self.root.display());
        Ok(source)
    }
}

fn subdirectory_names(dir: &Path) -> Result<Vec<String>, TrainError> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| TrainError::io(dir, e))? {
        let entry = entry.map_err(|e| TrainError::io(dir, e))?;
        if entry.path().is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(names)
}

/// Recursively copy the contents of `src` into `dst`, overwriting files.
fn copy_tree(src: &Path, dst: &Path) -> Result<(), TrainError> {
    fs::create_dir_all(dst).map_err(|e| TrainError::io(dst, e))?;
    for entry in fs::read_dir(src).map_err(|e| TrainError::io(src, e))? {
        let entry = entry.map_err(|e| TrainError::io(src, e))?;
        let from  = entry.path();
        let to    = dst.join(entry.file_name());
        if from.is_dir() {
            copy_tree(&from, &to)?;
        } else {
            fs::copy(&from, &to).map_err(|e| TrainError::io(&to, e))?;
        }
    }
    Ok(())
}
