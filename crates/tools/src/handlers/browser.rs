//! `browser_action`: drive a remote browser service when one is configured,
//! otherwise fall back to plain HTTP for the read-only actions.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use loopclaw_core::error::ToolError;
use loopclaw_core::tool::{Tool, ToolOutput};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::fetch::{fetch_page, web_url, MAX_PAGE_CHARS};
use super::{optional_str, required_str};
use crate::context::ToolContext;
use crate::html::clip;
use crate::kind::ToolKind;

pub struct BrowserActionTool {
    ctx: Arc<ToolContext>,
}

impl BrowserActionTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

/// Reply shape of the browser service's `POST /action`.
#[derive(Debug, Default, Deserialize)]
struct ServiceReply {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    screenshot: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Fields each action needs beyond `action` itself.
pub fn required_fields(action: &str) -> &'static [&'static str] {
    match action {
        "navigate" => &["url"],
        "click" => &["selector"],
        "type" => &["selector", "text"],
        "evaluate" => &["script"],
        _ => &[],
    }
}

fn check_fields(action: &str, arguments: &Value) -> Result<(), ToolError> {
    let missing: Vec<&str> = required_fields(action)
        .iter()
        .copied()
        .filter(|field| optional_str(arguments, field).is_none())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ToolError::InvalidArguments(format!(
            "action '{action}' requires: {}",
            missing.join(", ")
        )))
    }
}

impl BrowserActionTool {
    async fn via_service(&self, service: &str, arguments: &Value) -> Result<ToolOutput, ToolError> {
        let endpoint = format!("{}/action", service.trim_end_matches('/'));
        let limit = self.ctx.config.timeouts.browser_secs;
        debug!(%endpoint, "Forwarding browser action");

        let response = self
            .ctx
            .http
            .post(&endpoint)
            .json(arguments)
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
                    ToolError::failed(self.name(), format!("browser service unreachable: {e}"))
                }
            })?;

        let status = response.status();
        let reply: ServiceReply = response
            .json()
            .await
            .map_err(|e| ToolError::failed(self.name(), format!("bad browser service reply (HTTP {status}): {e}")))?;

        if !reply.success {
            let reason = reply.error.unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            return Ok(ToolOutput::failed(format!("Browser action failed: {reason}")));
        }

        let mut lines = Vec::new();
        if let Some(text) = reply.text.filter(|t| !t.trim().is_empty()) {
            lines.push(clip(&text, MAX_PAGE_CHARS));
        }
        match reply.result {
            Some(Value::String(s)) => lines.push(s),
            Some(Value::Null) | None => {}
            Some(other) => lines.push(other.to_string()),
        }

        let mut data = serde_json::Map::new();
        if let Some(encoded) = reply.screenshot {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(encoded.trim())
                .map_err(|e| ToolError::failed(self.name(), format!("bad screenshot encoding: {e}")))?;
            let path = self
                .ctx
                .fresh_file("screenshots", "png")
                .await
                .map_err(|e| ToolError::failed(self.name(), e))?;
            tokio::fs::write(&path, &bytes)
                .await
                .map_err(|e| ToolError::failed(self.name(), e))?;
            let relative = self.ctx.workspace.display_relative(&path);
            lines.push(format!("Screenshot saved to {relative}"));
            data.insert("screenshot".into(), Value::String(relative));
        }

        if lines.is_empty() {
            lines.push("Browser action completed.".into());
        }
        let output = ToolOutput::ok(lines.join("\n\n"));
        Ok(if data.is_empty() {
            output
        } else {
            output.with_data(Value::Object(data))
        })
    }

    async fn via_http(&self, action: &str, arguments: &Value) -> Result<ToolOutput, ToolError> {
        match action {
            "navigate" | "extract_text" => {
                let raw = optional_str(arguments, "url").ok_or_else(|| {
                    ToolError::InvalidArguments(format!(
                        "action '{action}' needs a 'url' when no browser service is configured"
                    ))
                })?;
                let url = web_url(self.name(), raw)?;
                let (final_url, content) = fetch_page(&self.ctx, self.name(), url, true).await?;
                Ok(ToolOutput::ok(format!(
                    "Page: {final_url}\n\n{}",
                    clip(&content, MAX_PAGE_CHARS)
                )))
            }
            other => Err(ToolError::NotConfigured {
                tool_name: self.name().into(),
                reason: format!("action '{other}' needs a browser service (tools.browser_url)"),
            }),
        }
    }
}

#[async_trait]
impl Tool for BrowserActionTool {
    fn name(&self) -> &str {
        ToolKind::BrowserAction.name()
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, ToolError> {
        let action = required_str(&arguments, "action")?;
        check_fields(action, &arguments)?;
        if let Some(url) = optional_str(&arguments, "url") {
            web_url(self.name(), url)?;
        }

        match self.ctx.config.browser_url.as_deref() {
            Some(service) => self.via_service(service, &arguments).await,
            None => self.via_http(action, &arguments).await,
        }
    }
}
