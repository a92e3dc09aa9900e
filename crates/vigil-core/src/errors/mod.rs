//! Error handling for Vigil.
//! One error enum per subsystem, `thiserror` only.

pub mod config_error;
pub mod engine_error;
pub mod error_code;
pub mod scan_error;
pub mod tool_error;

pub use config_error::ConfigError;
pub use engine_error::{Cancelled, EngineError, FatalError};
pub use error_code::ErrorCode;
pub use scan_error::ScanError;
pub use tool_error::ToolError;
