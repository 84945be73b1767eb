//! `fetch_url`: download a page and hand back readable text.

use std::sync::Arc;

use async_trait::async_trait;
use loopclaw_core::error::ToolError;
use loopclaw_core::tool::{Tool, ToolOutput};
use serde_json::Value;

use super::required_str;
use crate::context::ToolContext;
use crate::html::clip;
use crate::kind::ToolKind;

/// Longest page body handed back to the model.
pub const MAX_PAGE_CHARS: usize = 6000;

pub struct FetchUrlTool {
    ctx: Arc<ToolContext>,
}

impl FetchUrlTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

/// Parse and restrict to http(s).
pub(crate) fn web_url(tool_name: &str, raw: &str) -> Result<reqwest::Url, ToolError> {
    let url = reqwest::Url::parse(raw.trim())
        .map_err(|e| ToolError::InvalidArguments(format!("invalid URL '{raw}': {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ToolError::PermissionDenied {
            tool_name: tool_name.into(),
            reason: format!("scheme '{other}' is not allowed, use http or https"),
        }),
    }
}

/// GET a page and return (final URL, cleaned or raw body).
pub(crate) async fn fetch_page(
    ctx: &ToolContext,
    tool_name: &str,
    url: reqwest::Url,
    extract_text: bool,
) -> Result<(String, String), ToolError> {
    let response = ctx
        .http
        .get(url)
        .timeout(ToolContext::secs(ctx.config.timeouts.http_secs))
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                ToolError::Timeout {
                    tool_name: tool_name.into(),
                    timeout_secs: ctx.config.timeouts.http_secs,
                }
            } else {
                ToolError::failed(tool_name, format!("request failed: {e}"))
            }
        })?;

    let status = response.status();
    let final_url = response.url().to_string();
    if !status.is_success() {
        return Err(ToolError::failed(tool_name, format!("HTTP {} from {final_url}", status.as_u16())));
    }

    let is_html = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_none_or(|ct| ct.contains("html"));

    let body = response
        .text()
        .await
        .map_err(|e| ToolError::failed(tool_name, format!("could not read body: {e}")))?;

    let content = if extract_text && is_html {
        ctx.html.to_text(&body)
    } else {
        body
    };
    Ok((final_url, content))
}

#[async_trait]
impl Tool for FetchUrlTool {
    fn name(&self) -> &str {
        ToolKind::FetchUrl.name()
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, ToolError> {
        let url = web_url(self.name(), required_str(&arguments, "url")?)?;
        let extract_text = arguments["extract_text"].as_bool().unwrap_or(true);

        let (final_url, content) = fetch_page(&self.ctx, self.name(), url, extract_text).await?;
        let chars = content.chars().count();

        Ok(ToolOutput::ok(format!("URL: {final_url}\n\n{}", clip(&content, MAX_PAGE_CHARS)))
            .with_data(serde_json::json!({ "url": final_url, "chars": chars })))
    }
}
