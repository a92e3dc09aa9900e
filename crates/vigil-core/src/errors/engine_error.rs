//! Orchestration errors: cancellation, fatal invariant violations, and the
//! top-level error returned to callers of the engine.

use super::error_code::{self, ErrorCode};
use super::ConfigError;

/// Cooperative cancellation observed at a checkpoint.
///
/// Expected control flow, never logged as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Unrecoverable orchestration failures. The run is aborted.
#[derive(Debug, thiserror::Error)]
pub enum FatalError {
    #[error("enumerator did not shut down within {timeout_ms}ms\n{diagnostics}")]
    EnumeratorShutdownTimeout { timeout_ms: u64, diagnostics: String },

    #[error("queue sentinel observed twice")]
    DoubleSentinel,

    #[error("enumerator thread panicked: {0}")]
    EnumeratorPanicked(String),

    #[error("worker pool failure: {0}")]
    WorkerPool(String),
}

/// Errors surfaced to the caller of an analysis run.
///
/// Preemption is handled internally and never appears here.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Analysis cancelled")]
    Cancelled,

    #[error("Fatal orchestration error: {0}")]
    Fatal(#[from] FatalError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Illegal state: {0}")]
    IllegalState(String),
}

impl From<Cancelled> for EngineError {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}

impl ErrorCode for FatalError {
    fn error_code(&self) -> &'static str {
        error_code::FATAL_ERROR
    }
}

impl ErrorCode for EngineError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Cancelled => error_code::CANCELLED,
            Self::Fatal(e) => e.error_code(),
            Self::Config(e) => e.error_code(),
            Self::IllegalState(_) => error_code::ILLEGAL_STATE,
        }
    }
}
