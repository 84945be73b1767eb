pub mod chat;
pub mod doctor;
pub mod init;
pub mod serve;
pub mod tools;

use std::sync::Arc;

use loopclaw_agent::AgentLoop;
use loopclaw_config::AppConfig;
use loopclaw_providers::OpenAiCompatProvider;
use loopclaw_tools::{ToolExecutor, builtin_registry};

/// Load config, or explain where it was expected.
pub fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    AppConfig::load().map_err(|e| format!("Failed to load config: {e}").into())
}

/// Provider, validated tool registry and loop, built from config.
pub fn build_agent(config: &AppConfig) -> Result<Arc<AgentLoop>, Box<dyn std::error::Error>> {
    let provider = Arc::new(OpenAiCompatProvider::from_config(&config.provider)?);
    let registry = builtin_registry(config.tools.clone()).map_err(|e| format!("Tool registry invalid: {e}"))?;
    let executor = Arc::new(ToolExecutor::new(registry));
    Ok(Arc::new(AgentLoop::from_config(provider, executor, config)))
}
