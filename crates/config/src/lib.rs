//! Configuration loading, validation, and management for LoopClaw.
//!
//! Loads configuration from `~/.loopclaw/config.toml`, validates it, then
//! applies environment variable overrides. A missing file means defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.loopclaw/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model backend connection
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Agent loop behavior
    #[serde(default)]
    pub agent: AgentConfig,

    /// HTTP gateway
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Tool handlers: workspace, interpreters, endpoints, timeouts
    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_name")]
    pub name: String,

    /// OpenAI-compatible base URL, ending before `/chat/completions`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

fn default_provider_name() -> String {
    "ollama".into()
}
fn default_base_url() -> String {
    "http://localhost:11434/v1".into()
}
fn default_model() -> String {
    "llama3.1".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_provider_timeout() -> u64 {
    120
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: default_provider_name(),
            base_url: default_base_url(),
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_provider_timeout(),
        }
    }
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Tool invocations allowed in one user turn
    #[serde(default = "default_max_tool_calls")]
    pub max_tool_calls: u32,

    /// Replaces the built-in agent instructions when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

fn default_max_tool_calls() -> u32 {
    10
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_tool_calls: default_max_tool_calls(),
            system_prompt: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Live sessions kept before the least recently active is evicted
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_port() -> u16 {
    42618
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_max_sessions() -> usize {
    1000
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            max_sessions: default_max_sessions(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Root every file-touching tool is scoped to
    #[serde(default = "default_workspace_dir")]
    pub workspace_dir: PathBuf,

    #[serde(default = "default_python")]
    pub python_bin: String,

    #[serde(default = "default_node")]
    pub node_bin: String,

    #[serde(default = "default_bash")]
    pub bash_bin: String,

    #[serde(default = "default_ffmpeg")]
    pub ffmpeg_bin: String,

    /// DuckDuckGo-compatible HTML search endpoint
    #[serde(default = "default_search_url")]
    pub search_url: String,

    /// Prompt-in-path image endpoint (`{image_url}/{prompt}?width=..`)
    #[serde(default = "default_image_url")]
    pub image_url: String,

    /// Hugging Face Inference compatible base URL
    #[serde(default = "default_inference_url")]
    pub inference_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inference_token: Option<String>,

    /// Browser automation service; plain HTTP fallback when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser_url: Option<String>,

    #[serde(default)]
    pub timeouts: ToolTimeouts,
}

fn default_workspace_dir() -> PathBuf {
    AppConfig::config_dir().join("workspace")
}
fn default_python() -> String {
    "python3".into()
}
fn default_node() -> String {
    "node".into()
}
fn default_bash() -> String {
    "bash".into()
}
fn default_ffmpeg() -> String {
    "ffmpeg".into()
}
fn default_search_url() -> String {
    "https://html.duckduckgo.com/html/".into()
}
fn default_image_url() -> String {
    "https://image.pollinations.ai/prompt".into()
}
fn default_inference_url() -> String {
    "https://api-inference.huggingface.co/models".into()
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            workspace_dir: default_workspace_dir(),
            python_bin: default_python(),
            node_bin: default_node(),
            bash_bin: default_bash(),
            ffmpeg_bin: default_ffmpeg(),
            search_url: default_search_url(),
            image_url: default_image_url(),
            inference_url: default_inference_url(),
            inference_token: None,
            browser_url: None,
            timeouts: ToolTimeouts::default(),
        }
    }
}

impl std::fmt::Debug for ToolsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolsConfig")
            .field("workspace_dir", &self.workspace_dir)
            .field("python_bin", &self.python_bin)
            .field("node_bin", &self.node_bin)
            .field("bash_bin", &self.bash_bin)
            .field("ffmpeg_bin", &self.ffmpeg_bin)
            .field("search_url", &self.search_url)
            .field("image_url", &self.image_url)
            .field("inference_url", &self.inference_url)
            .field("inference_token", &redact(&self.inference_token))
            .field("browser_url", &self.browser_url)
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

/// Per-handler time limits, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolTimeouts {
    #[serde(default = "default_code_secs")]
    pub code_secs: u64,
    #[serde(default = "default_shell_secs")]
    pub shell_secs: u64,
    #[serde(default = "default_http_secs")]
    pub http_secs: u64,
    #[serde(default = "default_image_secs")]
    pub image_secs: u64,
    #[serde(default = "default_media_secs")]
    pub media_secs: u64,
    #[serde(default = "default_inference_secs")]
    pub inference_secs: u64,
    #[serde(default = "default_analysis_secs")]
    pub analysis_secs: u64,
    #[serde(default = "default_devops_secs")]
    pub devops_secs: u64,
    #[serde(default = "default_browser_secs")]
    pub browser_secs: u64,
}

fn default_code_secs() -> u64 {
    30
}
fn default_shell_secs() -> u64 {
    120
}
fn default_http_secs() -> u64 {
    15
}
fn default_image_secs() -> u64 {
    120
}
fn default_media_secs() -> u64 {
    300
}
fn default_inference_secs() -> u64 {
    60
}
fn default_analysis_secs() -> u64 {
    120
}
fn default_devops_secs() -> u64 {
    300
}
fn default_browser_secs() -> u64 {
    60
}

impl Default for ToolTimeouts {
    fn default() -> Self {
        Self {
            code_secs: default_code_secs(),
            shell_secs: default_shell_secs(),
            http_secs: default_http_secs(),
            image_secs: default_image_secs(),
            media_secs: default_media_secs(),
            inference_secs: default_inference_secs(),
            analysis_secs: default_analysis_secs(),
            devops_secs: default_devops_secs(),
            browser_secs: default_browser_secs(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.loopclaw/config.toml).
    ///
    /// Environment overrides, applied after the file:
    /// - `LOOPCLAW_MODEL`, `LOOPCLAW_BASE_URL`, `LOOPCLAW_API_KEY`
    /// - `LOOPCLAW_WORKSPACE`
    /// - `HF_TOKEN` (inference token, only when the file sets none)
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(model) = lookup("LOOPCLAW_MODEL") {
            self.provider.model = model;
        }
        if let Some(url) = lookup("LOOPCLAW_BASE_URL") {
            self.provider.base_url = url;
        }
        if let Some(key) = lookup("LOOPCLAW_API_KEY") {
            self.provider.api_key = Some(key);
        }
        if let Some(dir) = lookup("LOOPCLAW_WORKSPACE") {
            self.tools.workspace_dir = PathBuf::from(dir);
        }
        if self.tools.inference_token.is_none() {
            self.tools.inference_token = lookup("HF_TOKEN");
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".loopclaw")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.provider.temperature) {
            return Err(ConfigError::ValidationError(
                "provider.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_tool_calls == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_tool_calls must be at least 1".into(),
            ));
        }

        if self.gateway.max_sessions == 0 {
            return Err(ConfigError::ValidationError(
                "gateway.max_sessions must be at least 1".into(),
            ));
        }

        if self.provider.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError("provider.base_url is empty".into()));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
