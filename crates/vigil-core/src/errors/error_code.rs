//! ErrorCode trait for structured error reporting.

/// Every error enum implements this to expose a stable machine-readable code.
pub trait ErrorCode {
    /// Returns the error code string (e.g., "TOOL_ERROR").
    fn error_code(&self) -> &'static str;

    /// Returns the formatted string: `[ERROR_CODE] message`.
    fn coded_string(&self) -> String
    where
        Self: std::fmt::Display,
    {
        format!("[{}] {}", self.error_code(), self)
    }
}

pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
pub const SCAN_ERROR: &str = "SCAN_ERROR";
pub const TOOL_ERROR: &str = "TOOL_ERROR";
pub const TOOL_PANIC: &str = "TOOL_PANIC";
pub const CANCELLED: &str = "CANCELLED";
pub const FATAL_ERROR: &str = "FATAL_ERROR";
pub const ILLEGAL_STATE: &str = "ILLEGAL_STATE";
