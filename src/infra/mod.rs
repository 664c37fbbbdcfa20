// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches the disk on behalf of a run, plus the
// local stand-ins for the external collaborators:
//
//   instance_store.rs      — versioned instance layout
//                            (allocate → materialize → promote)
//
//   checkpoint.rs          — model weights per step + the run's
//                            TrainConfig, under train/
//
//   metrics.rs             — step/loss/learning-rate CSV log
//
//   instance_classifier.rs — Classifier over a promoted instance
//                            and the loader that finds the
//                            released one
//
//   tokenizer_store.rs     — word-level tokenizer build/load
//   local_embedder.rs      — tokenizer-backed EmbeddingProvider
//   sample_file.rs         — JSON-lines SampleStore
//
// The application layer only sees these through the Layer 3
// traits, except the instance store and checkpoint manager which
// it owns directly.
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Versioned on-disk instance layout
pub mod instance_store;

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;

/// Filesystem-backed classifier references
pub mod instance_classifier;

/// Tokenizer training, saving, and loading
pub mod tokenizer_store;

/// Local embedding provider
pub mod local_embedder;

/// JSON-lines sample store
pub mod sample_file;
