//! Unit source errors.

use std::path::PathBuf;

use super::error_code::{self, ErrorCode};

/// Errors raised while enumerating or reading analysis units.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("IO error reading {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Unit source failed: {0}")]
    Source(String),

    #[error("Scan cancelled")]
    Cancelled,
}

impl ErrorCode for ScanError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Cancelled => error_code::CANCELLED,
            _ => error_code::SCAN_ERROR,
        }
    }
}
