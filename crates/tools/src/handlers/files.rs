//! `file_read`, `file_write` and `file_list`, all scoped to the workspace.

use std::sync::Arc;

use async_trait::async_trait;
use loopclaw_core::error::ToolError;
use loopclaw_core::tool::{Tool, ToolOutput};
use loopclaw_security::PathValidationError;
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use super::{optional_str, required_str};
use crate::context::ToolContext;
use crate::kind::ToolKind;

/// Largest file `file_read` will return.
pub const MAX_READ_BYTES: u64 = 1024 * 1024;

fn denied(tool_name: &str, e: PathValidationError) -> ToolError {
    ToolError::PermissionDenied {
        tool_name: tool_name.into(),
        reason: e.to_string(),
    }
}

pub struct FileReadTool {
    ctx: Arc<ToolContext>,
}

impl FileReadTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for FileReadTool {
    fn name(&self) -> &str {
        ToolKind::FileRead.name()
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, ToolError> {
        let raw = required_str(&arguments, "path")?;
        let path = self.ctx.workspace.resolve(raw).map_err(|e| denied(self.name(), e))?;

        let meta = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(e) => return Ok(ToolOutput::failed(format!("Failed to read '{raw}': {e}"))),
        };
        if !meta.is_file() {
            return Ok(ToolOutput::failed(format!("'{raw}' is not a file")));
        }
        if meta.len() > MAX_READ_BYTES {
            return Ok(ToolOutput::failed(format!(
                "'{raw}' is {} bytes, larger than the {MAX_READ_BYTES} byte read limit",
                meta.len()
            )));
        }

        match tokio::fs::read(&path).await {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(text) => Ok(ToolOutput::ok(text)),
                Err(_) => Ok(ToolOutput::failed(format!("'{raw}' is not a UTF-8 text file"))),
            },
            Err(e) => Ok(ToolOutput::failed(format!("Failed to read '{raw}': {e}"))),
        }
    }
}

pub struct FileWriteTool {
    ctx: Arc<ToolContext>,
}

impl FileWriteTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for FileWriteTool {
    fn name(&self) -> &str {
        ToolKind::FileWrite.name()
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, ToolError> {
        let raw = required_str(&arguments, "path")?;
        let content = required_str(&arguments, "content")?;
        let append = arguments["mode"].as_str() == Some("append");
        let path = self.ctx.workspace.resolve(raw).map_err(|e| denied(self.name(), e))?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent()
            && let Err(e) = tokio::fs::create_dir_all(parent).await
        {
            return Ok(ToolOutput::failed(format!("Failed to create directory: {e}")));
        }

        let written = async {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .write(true)
                .append(append)
                .truncate(!append)
                .open(&path)
                .await?;
            file.write_all(content.as_bytes()).await?;
            file.flush().await
        }
        .await;

        let mode = if append { "appended" } else { "wrote" };
        Ok(match written {
            Ok(()) => ToolOutput::ok(format!(
                "Successfully {mode} {} bytes to {}",
                content.len(),
                self.ctx.workspace.display_relative(&path)
            )),
            Err(e) => ToolOutput::failed(format!("Failed to write file: {e}")),
        })
    }
}

pub struct FileListTool {
    ctx: Arc<ToolContext>,
}

impl FileListTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for FileListTool {
    fn name(&self) -> &str {
        ToolKind::FileList.name()
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, ToolError> {
        let raw = optional_str(&arguments, "path");
        let dir = self.ctx.workspace.resolve_dir(raw).map_err(|e| denied(self.name(), e))?;

        let mut reader = match tokio::fs::read_dir(&dir).await {
            Ok(reader) => reader,
            Err(e) => {
                return Ok(ToolOutput::failed(format!(
                    "Failed to list '{}': {e}",
                    raw.unwrap_or(".")
                )));
            }
        };

        let mut entries = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| ToolError::failed(self.name(), e))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            let meta = entry.metadata().await.ok();
            let is_dir = meta.as_ref().is_some_and(|m| m.is_dir());
            let size = meta.as_ref().filter(|m| m.is_file()).map(|m| m.len());
            entries.push((name, is_dir, size));
        }
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let label = self.ctx.workspace.display_relative(&dir);
        let label = if label.is_empty() { ".".to_string() } else { label };
        if entries.is_empty() {
            return Ok(ToolOutput::ok(format!("{label} is empty")));
        }

        let lines: Vec<String> = entries
            .iter()
            .map(|(name, is_dir, size)| match (is_dir, size) {
                (true, _) => format!("{name}/"),
                (false, Some(size)) => format!("{name} ({size} bytes)"),
                (false, None) => name.clone(),
            })
            .collect();
        let data: Vec<Value> = entries
            .iter()
            .map(|(name, is_dir, size)| serde_json::json!({"name": name, "dir": is_dir, "size": size}))
            .collect();

        Ok(ToolOutput::ok(format!("{label}:\n{}", lines.join("\n"))).with_data(Value::Array(data)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::context;
    use serde_json::json;

    #[tokio::test]
    async fn write_then_read() {
        let (ctx, _dir) = context();
        let out = FileWriteTool::new(ctx.clone())
            .execute(json!({"path": "notes/a.txt", "content": "hello", "mode": "overwrite"}))
            .await
            .unwrap();
        assert!(out.success);
        assert!(out.output.contains("notes/a.txt"));

        let read = FileReadTool::new(ctx).execute(json!({"path": "notes/a.txt"})).await.unwrap();
        assert!(read.success);
        assert_eq!(read.output, "hello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn write_through_dangling_symlink_denied() {
        let (ctx, _dir) = context();
        let outside = tempfile::tempdir().unwrap();
        let target = outside.path().join("escaped.txt");
        std::os::unix::fs::symlink(&target, ctx.workspace.root().join("link")).unwrap();

        let err = FileWriteTool::new(ctx)
            .execute(json!({"path": "link", "content": "overwritten"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::PermissionDenied { .. }), "{err}");
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn append_mode_appends() {
        let (ctx, _dir) = context();
        let writer = FileWriteTool::new(ctx.clone());
        writer
            .execute(json!({"path": "log.txt", "content": "one\n", "mode": "overwrite"}))
            .await
            .unwrap();
        let out = writer
            .execute(json!({"path": "log.txt", "content": "two\n", "mode": "append"}))
            .await
            .unwrap();
        assert!(out.output.starts_with("Successfully appended"));
        let text = std::fs::read_to_string(ctx.workspace.root().join("log.txt")).unwrap();
        assert_eq!(text, "one\ntwo\n");
    }

    #[tokio::test]
    async fn overwrite_replaces() {
        let (ctx, _dir) = context();
        let writer = FileWriteTool::new(ctx.clone());
        writer
            .execute(json!({"path": "f.txt", "content": "long original text", "mode": "overwrite"}))
            .await
            .unwrap();
        writer
            .execute(json!({"path": "f.txt", "content": "short", "mode": "overwrite"}))
            .await
            .unwrap();
        let text = std::fs::read_to_string(ctx.workspace.root().join("f.txt")).unwrap();
        assert_eq!(text, "short");
    }

    #[tokio::test]
    async fn escape_attempts_denied() {
        let (ctx, _dir) = context();
        let read = FileReadTool::new(ctx.clone());
        assert!(matches!(
            read.execute(json!({"path": "../../etc/passwd"})).await,
            Err(ToolError::PermissionDenied { .. })
        ));
        assert!(matches!(
            read.execute(json!({"path": "/etc/passwd"})).await,
            Err(ToolError::PermissionDenied { .. })
        ));
        let write = FileWriteTool::new(ctx);
        assert!(matches!(
            write.execute(json!({"path": "/tmp/evil.txt", "content": "x"})).await,
            Err(ToolError::PermissionDenied { .. })
        ));
    }

    #[tokio::test]
    async fn missing_file_is_failed_result() {
        let (ctx, _dir) = context();
        let out = FileReadTool::new(ctx).execute(json!({"path": "nope.txt"})).await.unwrap();
        assert!(!out.success);
        assert!(out.output.contains("nope.txt"));
    }

    #[tokio::test]
    async fn list_directories_first() {
        let (ctx, _dir) = context();
        let root = ctx.workspace.root().to_path_buf();
        std::fs::create_dir(root.join("images")).unwrap();
        std::fs::write(root.join("b.txt"), "bb").unwrap();
        std::fs::write(root.join("a.txt"), "a").unwrap();

        let out = FileListTool::new(ctx).execute(json!({"path": "."})).await.unwrap();
        assert!(out.success);
        assert_eq!(out.output, ".:\nimages/\na.txt (1 bytes)\nb.txt (2 bytes)");
        assert_eq!(out.data.unwrap().as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn list_empty_workspace() {
        let (ctx, _dir) = context();
        let out = FileListTool::new(ctx).execute(json!({})).await.unwrap();
        assert_eq!(out.output, ". is empty");
    }
}
