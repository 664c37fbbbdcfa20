// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types and traits that define what the training
// pipeline works with. No burn types, no file I/O here.
//
//   vocabulary.rs — ordered label list + multi-hot encoding
//   sample.rs     — labeled samples, snapshot rows, examples
//   traits.rs     — the collaborators the pipeline depends on
//   error.rs      — the run-fatal error kinds
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

pub mod error;
pub mod sample;
pub mod traits;
pub mod vocabulary;
