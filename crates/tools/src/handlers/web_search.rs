//! `web_search`: DuckDuckGo HTML search.

use std::sync::Arc;

use async_trait::async_trait;
use loopclaw_core::error::ToolError;
use loopclaw_core::tool::{Tool, ToolOutput};
use serde_json::Value;

use super::{optional_u64, required_str};
use crate::context::ToolContext;
use crate::html::SearchHit;
use crate::kind::ToolKind;

const MAX_RESULTS: u64 = 10;

pub struct WebSearchTool {
    ctx: Arc<ToolContext>,
}

impl WebSearchTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

/// Numbered list the model can cite from.
pub fn render_hits(query: &str, hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return format!("No results found for '{query}'.");
    }
    let mut text = format!("Search results for '{query}':\n");
    for (i, hit) in hits.iter().enumerate() {
        text.push_str(&format!("\n{}. {}\n   {}\n", i + 1, hit.title, hit.url));
        if !hit.snippet.is_empty() {
            text.push_str(&format!("   {}\n", hit.snippet));
        }
    }
    text
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        ToolKind::WebSearch.name()
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, ToolError> {
        let query = required_str(&arguments, "query")?;
        let limit = optional_u64(&arguments, "num_results").unwrap_or(5).clamp(1, MAX_RESULTS) as usize;

        let response = self
            .ctx
            .http
            .get(&self.ctx.config.search_url)
            .query(&[("q", query)])
            .timeout(ToolContext::secs(self.ctx.config.timeouts.http_secs))
            .send()
            .await
            .map_err(|e| ToolError::failed(self.name(), format!("search request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(ToolError::failed(
                self.name(),
                format!("search endpoint returned HTTP {}", response.status().as_u16()),
            ));
        }

        let page = response
            .text()
            .await
            .map_err(|e| ToolError::failed(self.name(), format!("could not read results: {e}")))?;
        let hits = self.ctx.html.parse_search_results(&page, limit);

        Ok(ToolOutput::ok(render_hits(query, &hits)).with_data(serde_json::json!({ "results": hits })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::offline_context;
    use serde_json::json;

    #[test]
    fn render_numbers_hits() {
        let hits = vec![
            SearchHit {
                title: "Rust".into(),
                url: "https://www.rust-lang.org/".into(),
                snippet: "Reliable software".into(),
            },
            SearchHit {
                title: "Tokio".into(),
                url: "https://tokio.rs/".into(),
                snippet: String::new(),
            },
        ];
        let text = render_hits("rust", &hits);
        assert!(text.contains("1. Rust\n   https://www.rust-lang.org/\n   Reliable software"));
        assert!(text.contains("2. Tokio\n   https://tokio.rs/"));
    }

    #[test]
    fn render_empty() {
        assert_eq!(render_hits("zzz", &[]), "No results found for 'zzz'.");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_an_error() {
        let (ctx, _dir) = offline_context();
        let err = WebSearchTool::new(ctx)
            .execute(json!({"query": "rust", "num_results": 3}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("search request failed"));
    }
}
