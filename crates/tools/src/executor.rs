//! The tool executor: name lookup, argument validation, dispatch.
//!
//! `execute` always returns a [`ToolResult`]. Unknown names, invalid
//! arguments, handler errors and handler panics all come back as
//! `success: false` with a readable message.

use std::panic::AssertUnwindSafe;
use std::time::Instant;

use futures::FutureExt;
use loopclaw_core::error::ToolError;
use loopclaw_core::provider::ToolDefinition;
use loopclaw_core::schema::{into_tool_error, validate_arguments};
use loopclaw_core::tool::{ToolCall, ToolOutput, ToolResult};
use tracing::{info, warn};

use crate::catalog;
use crate::kind::ToolKind;
use crate::registry::ToolRegistry;

pub struct ToolExecutor {
    registry: ToolRegistry,
}

impl ToolExecutor {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    /// The catalog advertised to the model.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        catalog::definitions()
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Run one call. Duration covers lookup, validation and the handler.
    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        let started = Instant::now();
        let outcome = self.dispatch(call).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let output = match outcome {
            Ok(output) => output,
            Err(e) => ToolOutput::failed(e.to_string()),
        };

        if output.success {
            info!(tool = %call.name, call_id = %call.id, duration_ms, "Tool succeeded");
        } else {
            warn!(tool = %call.name, call_id = %call.id, duration_ms, error = %output.output, "Tool failed");
        }

        ToolResult {
            call_id: call.id.clone(),
            tool_name: call.name.clone(),
            success: output.success,
            output: output.output,
            data: output.data,
            duration_ms,
        }
    }

    async fn dispatch(&self, call: &ToolCall) -> Result<ToolOutput, ToolError> {
        let kind = ToolKind::from_name(&call.name).ok_or_else(|| {
            let available: Vec<_> = ToolKind::ALL.into_iter().map(ToolKind::name).collect();
            ToolError::NotFound(format!("'{}'. Available tools: {}", call.name, available.join(", ")))
        })?;

        let handler = self
            .registry
            .get(kind)
            .ok_or_else(|| ToolError::NotFound(format!("'{}' has no registered handler", call.name)))?;

        let arguments = validate_arguments(&catalog::spec(kind).parameters, &call.arguments)
            .map_err(|issues| into_tool_error(&issues))?;

        match AssertUnwindSafe(handler.execute(arguments)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "handler panicked".into());
                Err(ToolError::failed(kind.name(), format!("internal error: {reason}")))
            }
        }
    }
}
