//! `run_shell`: execute a command line in the workspace.

use std::sync::Arc;

use async_trait::async_trait;
use loopclaw_core::error::ToolError;
use loopclaw_core::tool::{Tool, ToolOutput};
use serde_json::Value;
use tracing::debug;

use super::{optional_str, required_str, timeout_secs};
use crate::context::ToolContext;
use crate::kind::ToolKind;
use crate::process;

const MAX_TIMEOUT_SECS: u64 = 600;

pub struct RunShellTool {
    ctx: Arc<ToolContext>,
}

impl RunShellTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for RunShellTool {
    fn name(&self) -> &str {
        ToolKind::RunShell.name()
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, ToolError> {
        let command = required_str(&arguments, "command")?;

        loopclaw_security::check_shell(command).map_err(|b| ToolError::Blocked {
            tool_name: self.name().into(),
            pattern: b.pattern,
        })?;

        let cwd = self
            .ctx
            .workspace
            .resolve_dir(optional_str(&arguments, "cwd"))
            .map_err(|e| ToolError::PermissionDenied {
                tool_name: self.name().into(),
                reason: e.to_string(),
            })?;
        if !cwd.is_dir() {
            return Err(ToolError::InvalidArguments(format!(
                "cwd '{}' is not a directory",
                self.ctx.workspace.display_relative(&cwd)
            )));
        }

        let limit = timeout_secs(&arguments, self.ctx.config.timeouts.shell_secs, MAX_TIMEOUT_SECS);
        debug!(command = %command, cwd = %cwd.display(), "Executing shell command");

        let mut cmd = process::shell(command);
        cmd.current_dir(&cwd);
        let outcome = process::run(cmd, ToolContext::secs(limit), self.name()).await?;

        let text = outcome.render();
        Ok(if outcome.success() {
            ToolOutput::ok(text)
        } else {
            ToolOutput::failed(text)
        })
    }
}
