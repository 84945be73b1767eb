//! Scripted provider and tools shared by the agent tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use loopclaw_core::error::{ProviderError, ToolError};
use loopclaw_core::message::{Message, MessageToolCall};
use loopclaw_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use loopclaw_core::tool::{Tool, ToolOutput};
use loopclaw_tools::{ToolExecutor, ToolKind, ToolRegistry};
use serde_json::Value;

/// A mock provider that returns a sequence of scripted replies.
///
/// Each call to `complete` pops the next reply and records the request.
/// Panics if more calls are made than replies provided.
pub struct SequentialMockProvider {
    replies: Mutex<VecDeque<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(replies: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A provider that answers once with text and no tool calls.
    pub fn single_text(text: &str) -> Self {
        Self::new(vec![Ok(make_text_response(text))])
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("SequentialMockProvider: no more replies")
    }
}

fn usage() -> Option<Usage> {
    Some(Usage {
        prompt_tokens: 10,
        completion_tokens: 5,
        total_tokens: 15,
    })
}

/// A reply with text only.
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: usage(),
        model: "mock-model".into(),
    }
}

/// A reply requesting tool calls, with optional commentary.
pub fn make_tool_call_response(tool_calls: Vec<MessageToolCall>, text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant_with_calls(text, tool_calls),
        usage: usage(),
        model: "mock-model".into(),
    }
}

pub fn make_tool_call(id: &str, name: &str, args: Value) -> MessageToolCall {
    MessageToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments: serde_json::to_string(&args).unwrap(),
    }
}

/// Stands in for a real handler and counts dispatches.
struct ScriptedTool {
    kind: ToolKind,
    dispatched: Arc<AtomicUsize>,
}

#[async_trait]
impl Tool for ScriptedTool {
    fn name(&self) -> &str {
        self.kind.name()
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, ToolError> {
        self.dispatched.fetch_add(1, Ordering::SeqCst);
        Ok(match self.kind {
            ToolKind::ExecuteCode => ToolOutput::ok("exit code: 0\nstdout:\n4"),
            _ => ToolOutput::ok(format!("{} ok: {arguments}", self.kind)),
        })
    }
}

/// A full set of scripted handlers sharing one dispatch counter.
#[derive(Default, Clone)]
pub struct ScriptedTools {
    dispatched: Arc<AtomicUsize>,
}

impl ScriptedTools {
    pub fn executor(&self) -> Arc<ToolExecutor> {
        let mut registry = ToolRegistry::new();
        for kind in ToolKind::ALL {
            registry
                .register(Box::new(ScriptedTool {
                    kind,
                    dispatched: self.dispatched.clone(),
                }))
                .unwrap();
        }
        registry.validate().unwrap();
        Arc::new(ToolExecutor::new(registry))
    }

    pub fn dispatched(&self) -> usize {
        self.dispatched.load(Ordering::SeqCst)
    }
}

pub fn scripted_executor() -> Arc<ToolExecutor> {
    ScriptedTools::default().executor()
}
