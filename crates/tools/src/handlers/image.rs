//! `generate_image`: prompt-in-path image endpoint, result saved to the workspace.

use std::sync::Arc;

use async_trait::async_trait;
use loopclaw_core::error::ToolError;
use loopclaw_core::tool::{Tool, ToolOutput};
use serde_json::Value;

use super::{optional_u64, required_str};
use crate::context::ToolContext;
use crate::kind::ToolKind;

const MAX_DIMENSION: u64 = 2048;

pub struct GenerateImageTool {
    ctx: Arc<ToolContext>,
}

impl GenerateImageTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

/// `{base}/{prompt}?width=..&height=..&seed=..&nologo=true`
pub fn image_url(base: &str, prompt: &str, width: u64, height: u64, seed: Option<u64>) -> Result<reqwest::Url, ToolError> {
    let mut url = reqwest::Url::parse(base)
        .map_err(|e| ToolError::NotConfigured {
            tool_name: ToolKind::GenerateImage.name().into(),
            reason: format!("bad image endpoint '{base}': {e}"),
        })?;
    url.path_segments_mut()
        .map_err(|_| ToolError::NotConfigured {
            tool_name: ToolKind::GenerateImage.name().into(),
            reason: format!("image endpoint '{base}' cannot take a path"),
        })?
        .pop_if_empty()
        .push(prompt);
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("width", &width.to_string());
        query.append_pair("height", &height.to_string());
        if let Some(seed) = seed {
            query.append_pair("seed", &seed.to_string());
        }
        query.append_pair("nologo", "true");
    }
    Ok(url)
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    let mime = content_type.split(';').next().unwrap_or("").trim();
    match mime {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

#[async_trait]
impl Tool for GenerateImageTool {
    fn name(&self) -> &str {
        ToolKind::GenerateImage.name()
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, ToolError> {
        let prompt = required_str(&arguments, "prompt")?;
        let width = optional_u64(&arguments, "width").unwrap_or(1024).clamp(64, MAX_DIMENSION);
        let height = optional_u64(&arguments, "height").unwrap_or(1024).clamp(64, MAX_DIMENSION);
        let seed = optional_u64(&arguments, "seed");

        let url = image_url(&self.ctx.config.image_url, prompt, width, height, seed)?;
        let limit = self.ctx.config.timeouts.image_secs;

        let response = self
            .ctx
            .http
            .get(url.clone())
            .timeout(ToolContext::secs(limit))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ToolError::Timeout {
                        tool_name: self.name().into(),
                        timeout_secs: limit,
                    }
                } else {
                    ToolError::failed(self.name(), format!("image request failed: {e}"))
                }
            })?;

        if !response.status().is_success() {
            return Err(ToolError::failed(
                self.name(),
                format!("image endpoint returned HTTP {}", response.status().as_u16()),
            ));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let extension = extension_for(&content_type).ok_or_else(|| {
            ToolError::failed(self.name(), format!("endpoint did not return an image ({content_type})"))
        })?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ToolError::failed(self.name(), format!("could not read image: {e}")))?;

        let path = self
            .ctx
            .fresh_file("images", extension)
            .await
            .map_err(|e| ToolError::failed(self.name(), e))?;
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| ToolError::failed(self.name(), format!("could not save image: {e}")))?;

        let relative = self.ctx.workspace.display_relative(&path);
        Ok(ToolOutput::ok(format!(
            "Image saved to {relative} ({} bytes, {width}x{height})\nSource: {url}",
            bytes.len()
        ))
        .with_data(serde_json::json!({
            "path": relative,
            "url": url.to_string(),
            "width": width,
            "height": height,
        })))
    }
}
