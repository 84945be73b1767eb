//! Events a turn emits to its caller.
//!
//! The gateway forwards these over SSE and the CLI renders them directly.
//! Wire shape:
//! - `text`        { content }
//! - `tool_call`   { id, name, arguments }
//! - `tool_result` { toolCallId, toolName, result, success, durationMs }
//! - `error`       { message }
//! - `done`        { outcome, toolCalls, iterations }

use serde::{Deserialize, Serialize};

/// How a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnOutcome {
    /// The model gave a final answer.
    Complete,
    /// The model backend failed.
    Aborted,
    /// The per-turn tool-call cap was reached.
    BudgetExceeded,
    /// The caller stopped listening.
    Disconnected,
}

impl TurnOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Aborted => "aborted",
            Self::BudgetExceeded => "budget_exceeded",
            Self::Disconnected => "disconnected",
        }
    }
}

impl std::fmt::Display for TurnOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of a turn's output stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Model text. Concatenate in order to rebuild everything it said.
    Text { content: String },

    /// A tool invocation has been dispatched.
    ToolCall {
        id: String,
        name: String,
        arguments: serde_json::Value,
    },

    /// A dispatched invocation finished.
    #[serde(rename_all = "camelCase")]
    ToolResult {
        tool_call_id: String,
        tool_name: String,
        result: String,
        success: bool,
        duration_ms: u64,
    },

    /// The turn failed. Always followed by `Done`.
    Error { message: String },

    /// Terminal marker, exactly one per turn.
    #[serde(rename_all = "camelCase")]
    Done {
        outcome: TurnOutcome,
        tool_calls: u32,
        iterations: u32,
    },
}

impl StreamEvent {
    /// SSE event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::Error { .. } => "error",
            Self::Done { .. } => "done",
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_result_uses_camel_case_fields() {
        let event = StreamEvent::ToolResult {
            tool_call_id: "call_1".into(),
            tool_name: "execute_code".into(),
            result: "4".into(),
            success: true,
            duration_ms: 42,
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "type": "tool_result",
                "toolCallId": "call_1",
                "toolName": "execute_code",
                "result": "4",
                "success": true,
                "durationMs": 42
            })
        );
    }

    #[test]
    fn done_carries_outcome() {
        let event = StreamEvent::Done {
            outcome: TurnOutcome::BudgetExceeded,
            tool_calls: 10,
            iterations: 4,
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "done", "outcome": "budget_exceeded", "toolCalls": 10, "iterations": 4})
        );
    }

    #[test]
    fn tool_call_keeps_arguments_inline() {
        let event = StreamEvent::ToolCall {
            id: "call_9".into(),
            name: "web_search".into(),
            arguments: json!({"query": "rust"}),
        };
        let text = serde_json::to_string(&event).unwrap();
        assert!(text.contains(r#""type":"tool_call""#));
        assert!(text.contains(r#""arguments":{"query":"rust"}"#));
    }

    #[test]
    fn event_type_names() {
        assert_eq!(StreamEvent::Text { content: "x".into() }.event_type(), "text");
        assert_eq!(StreamEvent::Error { message: "x".into() }.event_type(), "error");
        let done = StreamEvent::Done {
            outcome: TurnOutcome::Complete,
            tool_calls: 0,
            iterations: 1,
        };
        assert_eq!(done.event_type(), "done");
        assert!(done.is_done());
    }

    #[test]
    fn event_deserialization() {
        let event: StreamEvent = serde_json::from_str(r#"{"type":"text","content":"hi"}"#).unwrap();
        assert_eq!(event, StreamEvent::Text { content: "hi".into() });
    }
}
