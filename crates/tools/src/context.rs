//! Shared state handed to every handler.

use std::path::PathBuf;
use std::time::Duration;

use loopclaw_config::ToolsConfig;
use loopclaw_security::Workspace;

use crate::html::HtmlCleaner;
use crate::registry::RegistryError;

const USER_AGENT: &str = concat!("loopclaw/", env!("CARGO_PKG_VERSION"));

/// Workspace, settings and clients shared by all handlers.
pub struct ToolContext {
    pub workspace: Workspace,
    pub config: ToolsConfig,
    pub http: reqwest::Client,
    pub html: HtmlCleaner,
}

impl ToolContext {
    pub fn new(config: ToolsConfig) -> Result<Self, RegistryError> {
        let workspace = Workspace::open(&config.workspace_dir)?;
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| RegistryError::Setup(format!("HTTP client: {e}")))?;
        let html = HtmlCleaner::new().map_err(|e| RegistryError::Setup(format!("HTML patterns: {e}")))?;

        Ok(Self {
            workspace,
            config,
            http,
            html,
        })
    }

    /// A fresh, uniquely named directory under `<workspace>/<category>/`.
    pub async fn fresh_dir(&self, category: &str) -> std::io::Result<PathBuf> {
        let dir = self
            .workspace
            .root()
            .join(category)
            .join(uuid::Uuid::new_v4().simple().to_string());
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    /// A unique file path under `<workspace>/<category>/`, parent created.
    pub async fn fresh_file(&self, category: &str, extension: &str) -> std::io::Result<PathBuf> {
        let dir = self.workspace.root().join(category);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir.join(format!("{}.{extension}", uuid::Uuid::new_v4().simple())))
    }

    /// A unique path in the system temp dir for throwaway scripts.
    pub fn scratch_file(&self, extension: &str) -> PathBuf {
        std::env::temp_dir().join(format!("loopclaw_{}.{extension}", uuid::Uuid::new_v4().simple()))
    }

    pub fn secs(value: u64) -> Duration {
        Duration::from_secs(value.max(1))
    }
}
