//! `analyze_data`: run a Python analysis script in its own output directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use loopclaw_core::error::ToolError;
use loopclaw_core::tool::{Tool, ToolOutput};
use serde_json::Value;
use tokio::process::Command;

use super::{optional_str, required_str};
use crate::context::ToolContext;
use crate::kind::ToolKind;
use crate::process;

pub struct AnalyzeDataTool {
    ctx: Arc<ToolContext>,
}

impl AnalyzeDataTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

/// Every file under `dir`, depth first, sorted within each directory.
async fn collect_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let mut reader = tokio::fs::read_dir(&current).await?;
        let mut children = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            children.push(entry.path());
        }
        children.sort();
        for child in children {
            if tokio::fs::metadata(&child).await?.is_dir() {
                pending.push(child);
            } else {
                files.push(child);
            }
        }
    }
    files.sort();
    Ok(files)
}

#[async_trait]
impl Tool for AnalyzeDataTool {
    fn name(&self) -> &str {
        ToolKind::AnalyzeData.name()
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, ToolError> {
        let code = required_str(&arguments, "code")?;
        let data_source = match optional_str(&arguments, "data_source") {
            Some(raw) => Some(self.ctx.workspace.resolve(raw).map_err(|e| ToolError::PermissionDenied {
                tool_name: self.name().into(),
                reason: e.to_string(),
            })?),
            None => None,
        };

        let run_dir = self
            .ctx
            .fresh_dir("analysis")
            .await
            .map_err(|e| ToolError::failed(self.name(), format!("could not create output dir: {e}")))?;
        let script = self.ctx.scratch_file("py");
        tokio::fs::write(&script, code)
            .await
            .map_err(|e| ToolError::failed(self.name(), format!("could not write script: {e}")))?;

        let mut command = Command::new(&self.ctx.config.python_bin);
        command
            .arg(&script)
            .current_dir(&run_dir)
            .env("OUTPUT_DIR", &run_dir)
            .env("WORKSPACE_DIR", self.ctx.workspace.root());
        if let Some(source) = &data_source {
            command.env("DATA_SOURCE", source);
        }

        let limit = self.ctx.config.timeouts.analysis_secs;
        let outcome = process::run(command, ToolContext::secs(limit), self.name()).await;
        if let Err(e) = tokio::fs::remove_file(&script).await {
            tracing::debug!(path = %script.display(), error = %e, "Could not remove script");
        }
        let outcome = outcome?;

        let artifacts: Vec<String> = collect_files(&run_dir)
            .await
            .unwrap_or_default()
            .iter()
            .map(|p| self.ctx.workspace.display_relative(p))
            .collect();
        if artifacts.is_empty() {
            let _ = tokio::fs::remove_dir_all(&run_dir).await;
        }

        let mut text = outcome.render();
        if !artifacts.is_empty() {
            text.push_str("\n\nArtifacts:\n");
            text.push_str(&artifacts.join("\n"));
        }
        let output = if outcome.success() {
            ToolOutput::ok(text)
        } else {
            ToolOutput::failed(text)
        };
        Ok(output.with_data(serde_json::json!({ "artifacts": artifacts })))
    }
}
