//! One handler per [`ToolKind`](crate::ToolKind).
//!
//! Handlers receive arguments that already passed schema validation, so the
//! accessors below only guard against the impossible.

pub mod analyze;
pub mod browser;
pub mod code;
pub mod devops;
pub mod draft;
pub mod fetch;
pub mod files;
pub mod image;
pub mod inference;
pub mod shell;
pub mod video;
pub mod web_search;

use loopclaw_core::error::ToolError;
use serde_json::Value;

pub(crate) fn required_str<'a>(arguments: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    arguments[key]
        .as_str()
        .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{key}' argument")))
}

pub(crate) fn optional_str<'a>(arguments: &'a Value, key: &str) -> Option<&'a str> {
    arguments[key].as_str().filter(|s| !s.trim().is_empty())
}

pub(crate) fn optional_u64(arguments: &Value, key: &str) -> Option<u64> {
    arguments[key].as_u64()
}

/// Caller-requested timeout, falling back to the configured one, capped.
pub(crate) fn timeout_secs(arguments: &Value, configured: u64, max: u64) -> u64 {
    optional_u64(arguments, "timeout").unwrap_or(configured).clamp(1, max)
}
