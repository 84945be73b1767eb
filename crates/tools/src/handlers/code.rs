//! `execute_code`: run a snippet in a fresh interpreter process.

use std::sync::Arc;

use async_trait::async_trait;
use loopclaw_core::error::ToolError;
use loopclaw_core::tool::{Tool, ToolOutput};
use serde_json::Value;
use tokio::process::Command;

use super::{required_str, timeout_secs};
use crate::context::ToolContext;
use crate::kind::ToolKind;
use crate::process;

const MAX_TIMEOUT_SECS: u64 = 300;

pub struct ExecuteCodeTool {
    ctx: Arc<ToolContext>,
}

impl ExecuteCodeTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }

    fn interpreter(&self, language: &str) -> Result<(&str, &'static str), ToolError> {
        let config = &self.ctx.config;
        match language {
            "python" => Ok((&config.python_bin, "py")),
            "javascript" => Ok((&config.node_bin, "js")),
            "bash" => Ok((&config.bash_bin, "sh")),
            other => Err(ToolError::InvalidArguments(format!("unsupported language '{other}'"))),
        }
    }
}

#[async_trait]
impl Tool for ExecuteCodeTool {
    fn name(&self) -> &str {
        ToolKind::ExecuteCode.name()
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, ToolError> {
        let language = required_str(&arguments, "language")?;
        let code = required_str(&arguments, "code")?;
        let limit = timeout_secs(&arguments, self.ctx.config.timeouts.code_secs, MAX_TIMEOUT_SECS);
        let (binary, extension) = self.interpreter(language)?;

        // Unique per call so concurrent sessions never share a script.
        let script = self.ctx.scratch_file(extension);
        tokio::fs::write(&script, code)
            .await
            .map_err(|e| ToolError::failed(self.name(), format!("could not write script: {e}")))?;

        let mut command = Command::new(binary);
        command.arg(&script).current_dir(self.ctx.workspace.root());
        let outcome = process::run(command, ToolContext::secs(limit), self.name()).await;

        if let Err(e) = tokio::fs::remove_file(&script).await {
            tracing::debug!(path = %script.display(), error = %e, "Could not remove script");
        }

        let outcome = outcome?;
        let text = outcome.render();
        Ok(if outcome.success() {
            ToolOutput::ok(text)
        } else {
            ToolOutput::failed(text)
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::context::test_support::context;
    use serde_json::json;

    #[tokio::test]
    async fn bash_snippet_runs() {
        let (ctx, _dir) = context();
        let tool = ExecuteCodeTool::new(ctx);
        let out = tool
            .execute(json!({"language": "bash", "code": "echo $((2+2))"}))
            .await
            .unwrap();
        assert!(out.success);
        assert!(out.output.contains("exit code: 0"));
        assert!(out.output.contains('4'));
    }

    #[tokio::test]
    async fn non_zero_exit_is_failure_with_stderr() {
        let (ctx, _dir) = context();
        let tool = ExecuteCodeTool::new(ctx);
        let out = tool
            .execute(json!({"language": "bash", "code": "echo nope >&2; exit 3"}))
            .await
            .unwrap();
        assert!(!out.success);
        assert!(out.output.contains("exit code: 3"));
        assert!(out.output.contains("nope"));
    }

    #[tokio::test]
    async fn runaway_code_times_out() {
        let (ctx, _dir) = context();
        let tool = ExecuteCodeTool::new(ctx);
        let err = tool
            .execute(json!({"language": "bash", "code": "sleep 30", "timeout": 1}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Timeout { timeout_secs: 1, .. }));
    }

    #[tokio::test]
    async fn runs_inside_workspace() {
        let (ctx, _dir) = context();
        let root = ctx.workspace.root().to_path_buf();
        let tool = ExecuteCodeTool::new(ctx);
        let out = tool.execute(json!({"language": "bash", "code": "pwd"})).await.unwrap();
        assert!(out.output.contains(root.to_str().unwrap()));
    }
}
