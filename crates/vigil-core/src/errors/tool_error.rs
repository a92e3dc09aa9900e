//! Per-tool errors. Recovered locally by the engine and never abort a run.

use super::engine_error::Cancelled;
use super::error_code::{self, ErrorCode};
use super::ScanError;

/// Errors a single tool can raise on a single unit (or a single global pass).
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Tool {tool} failed: {message}")]
    Failed { tool: String, message: String },

    #[error("Tool {tool} panicked: {message}")]
    Panicked { tool: String, message: String },

    #[error("Tool run cancelled")]
    Cancelled,
}

impl ToolError {
    /// Shorthand for `ToolError::Failed`.
    pub fn failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<Cancelled> for ToolError {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}

impl From<ScanError> for ToolError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::Cancelled => Self::Cancelled,
            other => Self::Failed {
                tool: "<unit source>".to_string(),
                message: other.to_string(),
            },
        }
    }
}

impl ErrorCode for ToolError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Failed { .. } => error_code::TOOL_ERROR,
            Self::Panicked { .. } => error_code::TOOL_PANIC,
            Self::Cancelled => error_code::CANCELLED,
        }
    }
}
