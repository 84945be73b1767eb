//! `create_video`: run a single ffmpeg command in the workspace.

use std::sync::Arc;

use async_trait::async_trait;
use loopclaw_core::error::ToolError;
use loopclaw_core::tool::{Tool, ToolOutput};
use serde_json::Value;

use super::required_str;
use crate::context::ToolContext;
use crate::kind::ToolKind;
use crate::process;

pub struct CreateVideoTool {
    ctx: Arc<ToolContext>,
}

impl CreateVideoTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

/// Swap the leading `ffmpeg` for the configured binary and make it
/// non-interactive.
pub fn rewrite_command(command: &str, ffmpeg_bin: &str) -> String {
    let rest = command.trim_start().strip_prefix("ffmpeg").unwrap_or(command).trim_start();
    format!("{ffmpeg_bin} -nostdin -hide_banner {rest}")
}

#[async_trait]
impl Tool for CreateVideoTool {
    fn name(&self) -> &str {
        ToolKind::CreateVideo.name()
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, ToolError> {
        let command = required_str(&arguments, "ffmpeg_command")?;
        let description = required_str(&arguments, "description")?;

        loopclaw_security::check_ffmpeg(command).map_err(|b| ToolError::Blocked {
            tool_name: self.name().into(),
            pattern: b.pattern,
        })?;

        let mut cmd = process::shell(&rewrite_command(command, &self.ctx.config.ffmpeg_bin));
        cmd.current_dir(self.ctx.workspace.root());
        let limit = self.ctx.config.timeouts.media_secs;
        let outcome = process::run(cmd, ToolContext::secs(limit), self.name()).await?;

        let text = format!("{description}\n{}", outcome.render());
        Ok(if outcome.success() {
            ToolOutput::ok(text)
        } else {
            ToolOutput::failed(text)
        })
    }
}
