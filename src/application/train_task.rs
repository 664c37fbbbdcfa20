// ============================================================
// Layer 2 — Train Model Task
// ============================================================
// Wraps a training run as a unit of background work that reports
// progress through a shared status string.
//
//   JSON ─▶ provider_from_json("TrainModel") ─▶ TrainModelTask
//        ─▶ spawn_task ─▶ (thread) resolve ─▶ TrainUseCase
//                                 │
//   status: "Training model X" ───┴──▶ "X/<instance>" or "Failed: ..."
//
// Missing `bert`/`vocab` are resolved once, before the run, from
// the currently released instance of the model. Runs never go
// through any result cache.

use anyhow::Result;
use serde::Deserialize;
use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
    thread::{self, JoinHandle},
};

use crate::application::train_use_case::{TrainCollaborators, TrainConfig, TrainUseCase};
use crate::domain::error::TrainError;
use crate::domain::traits::{ClassifierLoader, EmbedderFactory, SampleStore, StatusSink};
use crate::domain::vocabulary::Vocabulary;

pub const TRAIN_MODEL_TASK: &str = "TrainModel";
pub const DEFAULT_TASK_LIMIT: usize = 2000;

// ─── TaskProvider ─────────────────────────────────────────────────────────────
pub trait TaskProvider: Send {
    fn name(&self) -> &str;

    fn run(&self, status: &dyn StatusSink) -> Result<()>;
}

// ─── StatusHolder ─────────────────────────────────────────────────────────────
/// Shared, mutable status text. Clones share the same string.
#[derive(Debug, Clone, Default)]
pub struct StatusHolder {
    status: Arc<Mutex<String>>,
}

impl StatusHolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> String {
        self.status
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl StatusSink for StatusHolder {
    fn set_status(&self, status: String) {
        *self.status.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = status;
    }
}

// ─── Environment ──────────────────────────────────────────────────────────────
/// Collaborators and base training settings shared by every task.
#[derive(Clone)]
pub struct TaskEnvironment {
    pub embedders:   Arc<dyn EmbedderFactory>,
    pub samples:     Arc<dyn SampleStore + Send + Sync>,
    pub classifiers: Arc<dyn ClassifierLoader + Send + Sync>,
    pub config:      TrainConfig,
}

// ─── TrainModelTask ───────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrainModelRequest {
    pub base_classifier_dir: PathBuf,
    pub model: String,

    #[serde(default)]
    pub vocab: Option<Vec<String>>,

    #[serde(default)]
    pub bert: Option<String>,

    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_TASK_LIMIT
}

/// Embedding id and vocabulary a run will use, after fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTaskConfig {
    pub bert:  String,
    pub vocab: Vocabulary,
}

impl TrainModelRequest {
    /// Fill in whatever the request left out from the released
    /// classifier. The loader is only consulted when something is
    /// missing.
    pub fn resolve(&self, classifiers: &dyn ClassifierLoader) -> Result<ResolvedTaskConfig> {
        if let (Some(bert), Some(vocab)) = (&self.bert, &self.vocab) {
            return Ok(ResolvedTaskConfig { bert: bert.clone(), vocab: Vocabulary::new(vocab) });
        }

        let released = classifiers.load_released(&self.base_classifier_dir, &self.model)?;
        tracing::info!("Using released instance {} for missing task settings", released);

        let bert = match &self.bert {
            Some(bert) => bert.clone(),
            None => released.embedding_id().to_string(),
        };
        let vocab = match &self.vocab {
            Some(vocab) => Vocabulary::new(vocab),
            None => released.vocabulary().clone(),
        };
        Ok(ResolvedTaskConfig { bert, vocab })
    }
}

pub struct TrainModelTask {
    request: TrainModelRequest,
    env:     TaskEnvironment,
}

impl TrainModelTask {
    pub fn new(request: TrainModelRequest, env: TaskEnvironment) -> Self {
        Self { request, env }
    }
}

impl TaskProvider for TrainModelTask {
    fn name(&self) -> &str {
        TRAIN_MODEL_TASK
    }

    fn run(&self, status: &dyn StatusSink) -> Result<()> {
        let req = &self.request;
        status.set_status(format!("Training model {}", req.model));

        let resolved = req.resolve(self.env.classifiers.as_ref())?;
        let embedder = self.env.embedders.open(&resolved.bert)?;

        let config = TrainConfig { limit: req.limit, ..self.env.config.clone() };
        let use_case = TrainUseCase::new(&req.base_classifier_dir, &req.model, config)?;
        let collab = TrainCollaborators {
            embedder:    embedder.as_ref(),
            samples:     self.env.samples.as_ref(),
            classifiers: self.env.classifiers.as_ref(),
        };

        let classifier = use_case.execute(&collab, &resolved.vocab, None)?;
        status.set_status(classifier.to_string());
        Ok(())
    }
}

// ─── Registry ─────────────────────────────────────────────────────────────────
type ProviderCtor = fn(serde_json::Value, TaskEnvironment) -> Result<Box<dyn TaskProvider>>;

const PROVIDERS: &[(&str, ProviderCtor)] = &[(TRAIN_MODEL_TASK, train_model_provider as ProviderCtor)];

fn train_model_provider(json: serde_json::Value, env: TaskEnvironment) -> Result<Box<dyn TaskProvider>> {
    let request: TrainModelRequest = serde_json::from_value(json)
        .map_err(|e| TrainError::Configuration(format!("bad {TRAIN_MODEL_TASK} request: {e}")))?;
    Ok(Box::new(TrainModelTask::new(request, env)))
}

/// Build the task registered under `name` from its JSON body.
pub fn provider_from_json(name: &str, json: &str, env: TaskEnvironment) -> Result<Box<dyn TaskProvider>> {
    let ctor = PROVIDERS
        .iter()
        .find(|(registered, _)| *registered == name)
        .map(|(_, ctor)| *ctor)
        .ok_or_else(|| TrainError::Configuration(format!("unknown task provider '{name}'")))?;
    let value: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| TrainError::Configuration(format!("task body is not JSON: {e}")))?;
    ctor(value, env)
}

/// Run a task on its own thread. Failures end up in the status.
pub fn spawn_task(provider: Box<dyn TaskProvider>, status: StatusHolder) -> JoinHandle<()> {
    thread::spawn(move || {
        tracing::info!("Task '{}' started", provider.name());
        match provider.run(&status) {
            Ok(()) => tracing::info!("Task '{}' finished: {}", provider.name(), status.get()),
            Err(e) => {
                tracing::error!("Task '{}' failed: {e:#}", provider.name());
                status.set_status(format!("Failed: {e:#}"));
            }
        }
    })
}
