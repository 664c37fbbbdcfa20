// ============================================================
// Layer 3 — Training Error Kinds
// ============================================================
// Every failure in a training run is fatal to that run.
// Nothing in the pipeline retries; the caller decides whether
// to start a whole new run.
//
//   Configuration     → bad base directory, bad ratio, reused instance id
//   Data              → no samples to train on
//   ContractViolation → a collaborator broke its contract
//   Io                → a filesystem write or read failed
//   Export            → the training job produced no servable export
//
// Reference: thiserror crate documentation
//            Rust Book §9 (Recoverable Errors with Result)

use std::path::PathBuf;
use thiserror::Error;

/// The kind of a [`TrainError`], for callers that branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Data,
    ContractViolation,
    Io,
    Export,
}

#[derive(Debug, Error)]
pub enum TrainError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("data error: {0}")]
    Data(String),

    #[error("contract violation: {0}")]
    ContractViolation(String),

    #[error("io error at '{}': {source}", path.display())]
    Io {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("export error: {0}")]
    Export(String),
}

impl TrainError {
    /// Wrap an io::Error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_)     => ErrorKind::Configuration,
            Self::Data(_)              => ErrorKind::Data,
            Self::ContractViolation(_) => ErrorKind::ContractViolation,
            Self::Io { .. }            => ErrorKind::Io,
            Self::Export(_)            => ErrorKind::Export,
        }
    }
}

/// Find the [`ErrorKind`] of a TrainError carried inside an anyhow chain.
pub fn kind_of(err: &anyhow::Error) -> Option<ErrorKind> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<TrainError>())
        .map(TrainError::kind)
}
