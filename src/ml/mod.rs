// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn model and training code lives here (the checkpoint
// recorder in Layer 6 is the one other Burn user).
//
//   model.rs    — class-based attention head over embeddings
//   trainer.rs  — step-driven training loop + LR schedule
//   export.rs   — servable export under saved_models/<secs>/
//   servable.rs — loads an export back and scores records
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)

/// Class-based attention classifier
pub mod model;

/// Training loop with warm-up schedule and checkpointing
pub mod trainer;

/// Servable export
pub mod export;

/// Loader for exported models
pub mod servable;
