//! LoopClaw tools: the fixed catalog, its handlers, and the executor the
//! agent loop dispatches through.
//!
//! Every tool runs inside a single workspace directory. Process-running tools
//! are bounded by timeouts and screened by the deny-lists in
//! `loopclaw-security` before anything is spawned.

pub mod catalog;
pub mod context;
pub mod executor;
pub mod handlers;
pub mod html;
pub mod kind;
pub mod process;
pub mod registry;

use std::sync::Arc;

use loopclaw_config::ToolsConfig;

pub use context::ToolContext;
pub use executor::ToolExecutor;
pub use kind::ToolKind;
pub use registry::{RegistryError, ToolRegistry};

use handlers::{
    analyze::AnalyzeDataTool, browser::BrowserActionTool, code::ExecuteCodeTool, devops::DevopsTool,
    draft::DraftContentTool, fetch::FetchUrlTool, files::{FileListTool, FileReadTool, FileWriteTool},
    image::GenerateImageTool, inference::MlInferenceTool, shell::RunShellTool, video::CreateVideoTool,
    web_search::WebSearchTool,
};

/// Build a registry with a handler for every catalog entry.
pub fn builtin_registry(config: ToolsConfig) -> Result<ToolRegistry, RegistryError> {
    let ctx = Arc::new(ToolContext::new(config)?);

    let registry = ToolRegistry::new()
        .with(Box::new(ExecuteCodeTool::new(ctx.clone())))?
        .with(Box::new(RunShellTool::new(ctx.clone())))?
        .with(Box::new(WebSearchTool::new(ctx.clone())))?
        .with(Box::new(FetchUrlTool::new(ctx.clone())))?
        .with(Box::new(GenerateImageTool::new(ctx.clone())))?
        .with(Box::new(CreateVideoTool::new(ctx.clone())))?
        .with(Box::new(FileReadTool::new(ctx.clone())))?
        .with(Box::new(FileWriteTool::new(ctx.clone())))?
        .with(Box::new(FileListTool::new(ctx.clone())))?
        .with(Box::new(BrowserActionTool::new(ctx.clone())))?
        .with(Box::new(AnalyzeDataTool::new(ctx.clone())))?
        .with(Box::new(DraftContentTool::new()))?
        .with(Box::new(MlInferenceTool::new(ctx.clone())))?
        .with(Box::new(DevopsTool::new(ctx)))?;

    registry.validate()?;
    tracing::info!(tools = registry.len(), "Tool registry ready");
    Ok(registry)
}
