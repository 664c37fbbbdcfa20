// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Workflow coordination only: no model math, no printing, no
// raw path building. Two entry points:
//
//   train_use_case.rs — one training run, samples to promoted
//                       instance (the orchestrator)
//   train_task.rs     — the same run as background work with a
//                       status string, plus the task registry
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

/// The training orchestrator and its configuration
pub mod train_use_case;

/// Asynchronous task wrapper around a training run
pub mod train_task;
