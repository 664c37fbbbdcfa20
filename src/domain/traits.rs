// ============================================================
// Layer 3 — Collaborator Traits
// ============================================================
// The training pipeline talks to systems it does not own.
// Each one is a trait here; the pipeline only ever sees the trait.
//
//   EmbeddingProvider → text in, variable-length vector sequences out
//                       (EmbedderFactory opens one by service id)
//   SampleStore       → labeled samples for a model
//   ClassifierLoader  → classifier references over an instance
//                       (and the currently released one)
//   StatusSink        → where a task publishes its progress text
//
// Local implementations live in Layer 6 (infra); tests use
// in-module fakes.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use std::fmt;
use std::path::Path;

use crate::domain::sample::LabeledSample;
use crate::domain::vocabulary::Vocabulary;

// ─── EmbeddingProvider ────────────────────────────────────────────────────────
/// Maps raw texts to per-token embedding sequences.
///
/// Contract: `embed` returns exactly one sequence per input text, in
/// the same order. Every vector has the provider's hidden width.
pub trait EmbeddingProvider {
    /// Identifier of the embedding service (stored as `bert` in config.json)
    fn id(&self) -> &str;

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<Vec<f32>>>>;
}

/// Opens the embedding provider named by a service identifier.
pub trait EmbedderFactory: Send + Sync {
    fn open(&self, embedding_id: &str) -> Result<Box<dyn EmbeddingProvider>>;
}

// ─── SampleStore ──────────────────────────────────────────────────────────────
/// Read side of the labeled-sample datastore.
pub trait SampleStore {
    /// Samples for `model` flagged for training, ordered by sequence
    /// hash descending, at most `limit` of them.
    fn training_samples(&self, model: &str, limit: usize) -> Result<Vec<LabeledSample>>;
}

// ─── Classifier ───────────────────────────────────────────────────────────────
/// A classifier bound to one model instance.
///
/// Display renders the reference published as task status.
pub trait Classifier: fmt::Display + Send {
    fn model_name(&self) -> &str;

    fn instance_id(&self) -> &str;

    /// Embedding-service identifier this classifier was trained against
    fn embedding_id(&self) -> &str;

    fn vocabulary(&self) -> &Vocabulary;

    /// Recalibrate decision thresholds against a holdout split file.
    fn refresh_thresholds(&mut self, limit: usize, subset_file: &Path) -> Result<()>;
}

pub trait ClassifierLoader {
    fn load(
        &self,
        base_dir:    &Path,
        model_name:  &str,
        instance_id: &str,
    ) -> Result<Box<dyn Classifier>>;

    /// The instance currently released for serving.
    fn load_released(&self, base_dir: &Path, model_name: &str) -> Result<Box<dyn Classifier>>;
}

// ─── StatusSink ───────────────────────────────────────────────────────────────
/// Mutable status text owned by the task-execution subsystem.
pub trait StatusSink: Send + Sync {
    fn set_status(&self, status: String);
}
