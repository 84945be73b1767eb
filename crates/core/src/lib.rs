//! # LoopClaw Core
//!
//! Domain types, traits, and error definitions for the LoopClaw agent.
//! This crate has no framework dependencies. It defines the model every
//! other crate implements against:
//!
//! - [`Transcript`] and [`Message`]: the per-session conversation history
//! - [`ToolCall`], [`ToolResult`], [`ToolSpec`]: the tool invocation contract
//! - [`Provider`]: the model gateway seam
//! - [`schema::validate_arguments`]: argument checking against a declared schema

pub mod error;
pub mod message;
pub mod provider;
pub mod schema;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, GatewayFailure, ProviderError, Result, ToolError};
pub use message::{Message, MessageToolCall, Role, SessionId, Transcript};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage};
pub use tool::{ParamSpec, ParamType, ParameterSchema, Tool, ToolCall, ToolOutput, ToolResult, ToolSpec};
