//! Per-invocation fault containment.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

use vigil_core::errors::{ErrorCode, ToolError};
use vigil_core::events::types::ToolFailedEvent;
use vigil_core::events::EventDispatcher;

use super::descriptor::ToolId;

/// Run one tool invocation, converting a panic into `ToolError::Panicked`.
pub fn run_isolated<F>(tool: &ToolId, f: F) -> Result<(), ToolError>
where
    F: FnOnce() -> Result<(), ToolError>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(panic) => Err(ToolError::Panicked {
            tool: tool.to_string(),
            message: panic_message(panic.as_ref()),
        }),
    }
}

/// Log a tool failure and emit `ToolFailed`. The run continues.
pub fn report_failure(events: &EventDispatcher, tool: &ToolId, unit: Option<&Path>, err: &ToolError) {
    tracing::error!(
        tool = %tool,
        unit = unit.map(|u| u.display().to_string()).unwrap_or_default(),
        code = err.error_code(),
        error = %err,
        "tool failed"
    );
    events.emit_tool_failed(&ToolFailedEvent {
        tool_id: tool.to_string(),
        unit: unit.map(Path::to_path_buf),
        message: err.to_string(),
    });
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_becomes_tool_error() {
        let tool = ToolId::from("boom");
        let err = run_isolated(&tool, || panic!("exploded")).unwrap_err();
        match err {
            ToolError::Panicked { tool, message } => {
                assert_eq!(tool, "boom");
                assert_eq!(message, "exploded");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn errors_pass_through() {
        let tool = ToolId::from("t");
        assert!(run_isolated(&tool, || Ok(())).is_ok());
        assert!(run_isolated(&tool, || Err(ToolError::Cancelled)).unwrap_err().is_cancellation());
    }
}
