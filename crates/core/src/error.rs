//! Error types for the LoopClaw domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all LoopClaw operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// The two ways a model backend can let a turn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayFailure {
    /// The backend could not be reached or refused the request.
    Unavailable,
    /// The backend answered, but the reply was unusable.
    Malformed,
}

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Model backend unreachable: {0}")]
    Network(String),

    #[error("Malformed reply from model backend: {0}")]
    MalformedResponse(String),
}

impl ProviderError {
    /// Which side of the gateway contract this error falls on.
    pub fn class(&self) -> GatewayFailure {
        match self {
            ProviderError::MalformedResponse(_) => GatewayFailure::Malformed,
            _ => GatewayFailure::Unavailable,
        }
    }
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    NotFound(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool timed out: {tool_name} after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },

    #[error("Permission denied: {tool_name}: {reason}")]
    PermissionDenied { tool_name: String, reason: String },

    #[error("Blocked by policy: {tool_name} matched '{pattern}'")]
    Blocked { tool_name: String, pattern: String },

    #[error("{tool_name} is not configured: {reason}")]
    NotConfigured { tool_name: String, reason: String },
}

impl ToolError {
    pub fn failed(tool_name: &str, reason: impl std::fmt::Display) -> Self {
        ToolError::ExecutionFailed {
            tool_name: tool_name.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 503,
            message: "model loading".into(),
        });
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("model loading"));
    }

    #[test]
    fn provider_errors_classify() {
        assert_eq!(
            ProviderError::Network("connection refused".into()).class(),
            GatewayFailure::Unavailable
        );
        assert_eq!(
            ProviderError::Timeout("120s".into()).class(),
            GatewayFailure::Unavailable
        );
        assert_eq!(
            ProviderError::MalformedResponse("no choices".into()).class(),
            GatewayFailure::Malformed
        );
    }

    #[test]
    fn blocked_error_names_pattern() {
        let err = ToolError::Blocked {
            tool_name: "run_shell".into(),
            pattern: "rm -rf /".into(),
        };
        assert!(err.to_string().contains("run_shell"));
        assert!(err.to_string().contains("rm -rf /"));
    }
}
