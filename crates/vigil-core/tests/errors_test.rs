//! Tests for error codes and conversions.

use vigil_core::errors::error_code;
use vigil_core::errors::{Cancelled, EngineError, ErrorCode, FatalError, ScanError, ToolError};

#[test]
fn test_cancelled_converts_into_tool_error() {
    fn checkpoint() -> Result<(), Cancelled> {
        Err(Cancelled)
    }
    fn tool_body() -> Result<(), ToolError> {
        checkpoint()?;
        Ok(())
    }
    let err = tool_body().unwrap_err();
    assert!(err.is_cancellation());
    assert_eq!(err.error_code(), error_code::CANCELLED);
}

#[test]
fn test_scan_cancellation_maps_to_tool_cancellation() {
    assert!(ToolError::from(ScanError::Cancelled).is_cancellation());
    let io = ScanError::Source("index unavailable".into());
    assert!(!ToolError::from(io).is_cancellation());
}

#[test]
fn test_coded_string_format() {
    let err = ToolError::failed("L", "boom");
    assert_eq!(err.coded_string(), "[TOOL_ERROR] Tool L failed: boom");
}

#[test]
fn test_engine_error_codes() {
    assert_eq!(EngineError::Cancelled.error_code(), error_code::CANCELLED);
    let fatal = EngineError::from(FatalError::DoubleSentinel);
    assert_eq!(fatal.error_code(), error_code::FATAL_ERROR);
    assert_eq!(
        EngineError::IllegalState("nested".into()).error_code(),
        error_code::ILLEGAL_STATE
    );
}
