//! `draft_content`: no I/O, just a structured brief the model writes from.

use async_trait::async_trait;
use loopclaw_core::error::ToolError;
use loopclaw_core::tool::{Tool, ToolOutput};
use serde_json::Value;

use super::{optional_str, required_str};
use crate::kind::ToolKind;

#[derive(Default)]
pub struct DraftContentTool;

impl DraftContentTool {
    pub fn new() -> Self {
        Self
    }
}

fn platform_guidance(platform: &str) -> Option<&'static str> {
    match platform.trim().to_ascii_lowercase().as_str() {
        "instagram" => Some(
            "Open with a hook in the first line. Keep paragraphs to one or two lines, \
             use a few relevant emoji, end with a call to action and 5-10 hashtags.",
        ),
        "youtube" => Some(
            "Structure as a video script: hook (first 10 seconds), intro, main segments \
             with timestamps, and an outro asking viewers to like and subscribe. \
             Include a title and a description with keywords.",
        ),
        "twitter" | "x" => Some(
            "Stay under 280 characters per post. If the topic needs more, write a \
             numbered thread. Use at most two hashtags.",
        ),
        "linkedin" => Some(
            "Professional voice. Lead with an insight or result, use short paragraphs \
             and whitespace, and close with a question that invites comments.",
        ),
        "blog" => Some(
            "Use a clear title, an introduction, H2 sections with descriptive headings, \
             and a conclusion. Optimise headings for search.",
        ),
        _ => None,
    }
}

fn length_target(length: &str) -> &'static str {
    match length {
        "short" => "roughly 50-150 words",
        "long" => "roughly 800-1500 words",
        _ => "roughly 300-500 words",
    }
}

/// Assemble the drafting brief.
pub fn build_brief(kind: &str, topic: &str, platform: Option<&str>, tone: &str, length: &str) -> String {
    let mut brief = format!("Write a {kind} about \"{topic}\".\n\nTone: {tone}\nLength: {}", length_target(length));
    if let Some(platform) = platform {
        brief.push_str(&format!("\nPlatform: {platform}"));
        if let Some(guidance) = platform_guidance(platform) {
            brief.push_str("\nPlatform guidance: ");
            brief.push_str(guidance);
        }
    }
    brief.push_str("\n\nWrite the final content now in your reply. Do not call this tool again for the same draft.");
    brief
}

#[async_trait]
impl Tool for DraftContentTool {
    fn name(&self) -> &str {
        ToolKind::DraftContent.name()
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, ToolError> {
        let kind = required_str(&arguments, "type")?;
        let topic = required_str(&arguments, "topic")?;
        let platform = optional_str(&arguments, "platform");
        let tone = optional_str(&arguments, "tone").unwrap_or("engaging");
        let length = optional_str(&arguments, "length").unwrap_or("medium");

        Ok(ToolOutput::ok(build_brief(kind, topic, platform, tone, length)))
    }
}
