//! Configuration errors.

use super::error_code::{self, ErrorCode};

/// Failures while resolving config layers. Fatal to `VigilConfig::load`
/// except for an unreadable user config, which is skipped.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config layer {path}")]
    FileNotFound { path: String },

    #[error("invalid TOML in {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("{field} {message}")]
    ValidationFailed { field: String, message: String },
}

impl ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        error_code::CONFIG_ERROR
    }
}
