//! The tool-calling loop.
//!
//! One call to [`AgentLoop::run_turn`] takes a user message through
//! model → tools → model rounds until the model answers without tool calls,
//! the backend fails, or the per-turn tool-call cap is reached. Every step is
//! reported on the event channel before the next one starts, and the turn
//! always ends with exactly one `Done`.

use std::sync::Arc;

use loopclaw_config::AppConfig;
use loopclaw_core::message::{MessageToolCall, Transcript};
use loopclaw_core::provider::{Provider, ProviderRequest};
use loopclaw_core::tool::{ToolCall, ToolResult};
use loopclaw_tools::ToolExecutor;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::stream_event::{StreamEvent, TurnOutcome};

/// Default cap on tool invocations per user turn.
pub const DEFAULT_MAX_TOOL_CALLS: u32 = 10;

const SKIPPED_OVER_BUDGET: &str = "not executed: tool-call budget for this turn is exhausted";
const SKIPPED_DISCONNECTED: &str = "not executed: the caller disconnected";

/// What a finished turn looked like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnSummary {
    pub outcome: TurnOutcome,
    /// Tool invocations actually dispatched.
    pub tool_calls: u32,
    /// Model calls made.
    pub iterations: u32,
}

/// Drives turns against one model and one tool executor.
///
/// Holds no conversation state of its own; the transcript is passed in, so a
/// single loop can serve every session.
pub struct AgentLoop {
    provider: Arc<dyn Provider>,
    executor: Arc<ToolExecutor>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    max_tool_calls: u32,
}

/// Event sink that remembers when the receiver has gone away.
struct Emitter<'a> {
    tx: &'a mpsc::Sender<StreamEvent>,
    closed: bool,
}

impl<'a> Emitter<'a> {
    fn new(tx: &'a mpsc::Sender<StreamEvent>) -> Self {
        Self {
            closed: tx.is_closed(),
            tx,
        }
    }

    async fn send(&mut self, event: StreamEvent) {
        if self.closed {
            return;
        }
        if self.tx.send(event).await.is_err() {
            debug!("Event receiver dropped");
            self.closed = true;
        }
    }

    fn closed(&self) -> bool {
        self.closed || self.tx.is_closed()
    }
}

fn skipped(call: &MessageToolCall, reason: &str) -> ToolResult {
    ToolResult {
        call_id: call.id.clone(),
        tool_name: call.name.clone(),
        success: false,
        output: reason.to_string(),
        data: None,
        duration_ms: 0,
    }
}

/// The explanatory text sent when a turn runs out of tool calls.
pub fn budget_message(max_tool_calls: u32) -> String {
    format!(
        "I've reached the limit of {max_tool_calls} tool calls for this request, so I'm stopping here. \
         The results so far are above; send another message if you'd like me to continue."
    )
}

impl AgentLoop {
    pub fn new(provider: Arc<dyn Provider>, executor: Arc<ToolExecutor>, model: impl Into<String>) -> Self {
        Self {
            provider,
            executor,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            max_tool_calls: DEFAULT_MAX_TOOL_CALLS,
        }
    }

    /// Build a loop with model settings and the tool cap taken from config.
    pub fn from_config(provider: Arc<dyn Provider>, executor: Arc<ToolExecutor>, config: &AppConfig) -> Self {
        Self::new(provider, executor, config.provider.model.clone())
            .with_temperature(config.provider.temperature)
            .with_max_tokens(config.provider.max_tokens)
            .with_max_tool_calls(config.agent.max_tool_calls)
    }

    /// Set the per-turn tool-call cap. Zero is treated as one.
    pub fn with_max_tool_calls(mut self, max: u32) -> Self {
        self.max_tool_calls = max.max(1);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the default max tokens per model reply.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn max_tool_calls(&self) -> u32 {
        self.max_tool_calls
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn executor(&self) -> &Arc<ToolExecutor> {
        &self.executor
    }

    fn request(&self, transcript: &Transcript) -> ProviderRequest {
        ProviderRequest {
            model: self.model.clone(),
            messages: transcript.messages().to_vec(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools: self.executor.definitions(),
        }
    }

    /// Process one user message.
    ///
    /// Everything appended to the transcript stays there whatever the
    /// outcome. If the receiver is dropped the loop stops at the next step
    /// boundary; a tool that is already running is allowed to finish.
    pub async fn run_turn(
        &self,
        transcript: &mut Transcript,
        message: &str,
        events: &mpsc::Sender<StreamEvent>,
    ) -> TurnSummary {
        let mut out = Emitter::new(events);
        let mut tool_calls: u32 = 0;
        let mut iterations: u32 = 0;

        transcript.push_user(message);
        info!(model = %self.model, messages = transcript.len(), "Turn started");

        let outcome = loop {
            if out.closed() {
                break TurnOutcome::Disconnected;
            }

            iterations += 1;
            debug!(iteration = iterations, "Calling model");

            let response = match self.provider.complete(self.request(transcript)).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(iteration = iterations, class = ?e.class(), error = %e, "Model call failed");
                    out.send(StreamEvent::Error { message: e.to_string() }).await;
                    break TurnOutcome::Aborted;
                }
            };

            let reply = response.message;
            if reply.tool_calls.is_empty() {
                // The final answer is always surfaced, even when empty.
                transcript.push_reply(reply.content.clone(), Vec::new());
                out.send(StreamEvent::Text { content: reply.content }).await;
                break TurnOutcome::Complete;
            }

            let calls = reply.tool_calls;
            transcript.push_reply(reply.content.clone(), calls.clone());
            if !reply.content.is_empty() {
                out.send(StreamEvent::Text { content: reply.content }).await;
            }

            let remaining = self.max_tool_calls.saturating_sub(tool_calls) as usize;
            let (batch, over_budget) = calls.split_at(calls.len().min(remaining));
            let batch: Vec<ToolCall> = batch.iter().map(ToolCall::from).collect();
            debug!(requested = calls.len(), dispatching = batch.len(), "Executing tool batch");

            for call in &batch {
                out.send(StreamEvent::ToolCall {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    arguments: call.arguments.clone(),
                })
                .await;
            }

            for (call, requested) in batch.iter().zip(&calls) {
                if out.closed() {
                    transcript.push_tool_result(&skipped(requested, SKIPPED_DISCONNECTED));
                    continue;
                }
                let result = self.executor.execute(call).await;
                tool_calls += 1;
                transcript.push_tool_result(&result);
                out.send(StreamEvent::ToolResult {
                    tool_call_id: result.call_id,
                    tool_name: result.tool_name,
                    result: result.output,
                    success: result.success,
                    duration_ms: result.duration_ms,
                })
                .await;
            }

            // Every requested call gets a tool message, dispatched or not.
            for requested in over_budget {
                transcript.push_tool_result(&skipped(requested, SKIPPED_OVER_BUDGET));
            }

            if tool_calls >= self.max_tool_calls {
                warn!(tool_calls, max = self.max_tool_calls, "Tool-call budget exhausted");
                let text = budget_message(self.max_tool_calls);
                transcript.push_reply(text.clone(), Vec::new());
                out.send(StreamEvent::Text { content: text }).await;
                break TurnOutcome::BudgetExceeded;
            }
        };

        info!(%outcome, tool_calls, iterations, "Turn finished");
        out.send(StreamEvent::Done {
            outcome,
            tool_calls,
            iterations,
        })
        .await;

        TurnSummary {
            outcome,
            tool_calls,
            iterations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use loopclaw_core::error::ProviderError;
    use loopclaw_core::message::Role;
    use serde_json::json;

    async fn run(agent: &AgentLoop, transcript: &mut Transcript, message: &str) -> (TurnSummary, Vec<StreamEvent>) {
        let (tx, mut rx) = mpsc::channel(256);
        let summary = agent.run_turn(transcript, message, &tx).await;
        drop(tx);
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        (summary, events)
    }

    fn types(events: &[StreamEvent]) -> Vec<&'static str> {
        events.iter().map(StreamEvent::event_type).collect()
    }

    #[tokio::test]
    async fn plain_answer() {
        let provider = Arc::new(SequentialMockProvider::single_text("Hello! How can I help?"));
        let agent = AgentLoop::new(provider.clone(), scripted_executor(), "mock-model");
        let mut transcript = Transcript::new("sys");

        let (summary, events) = run(&agent, &mut transcript, "Hello!").await;
        assert_eq!(types(&events), ["text", "done"]);
        assert_eq!(summary.outcome, TurnOutcome::Complete);
        assert_eq!(summary.iterations, 1);
        // System + User + Assistant
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript.last().role, Role::Assistant);

        let request = &provider.requests()[0];
        assert_eq!(request.tools.len(), loopclaw_tools::ToolKind::ALL.len());
        assert_eq!(request.model, "mock-model");
    }

    #[tokio::test]
    async fn compute_with_code_then_answer() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            Ok(make_tool_call_response(
                vec![make_tool_call("call_1", "execute_code", json!({"language": "python", "code": "print(2+2)"}))],
                "Let me compute that.",
            )),
            Ok(make_text_response("4")),
        ]));
        let agent = AgentLoop::new(provider.clone(), scripted_executor(), "mock-model");
        let mut transcript = Transcript::new("sys");

        let (summary, events) = run(&agent, &mut transcript, "what is 2+2, compute it with code").await;
        assert_eq!(types(&events), ["text", "tool_call", "tool_result", "text", "done"]);
        assert_eq!(events[0], StreamEvent::Text { content: "Let me compute that.".into() });
        match &events[2] {
            StreamEvent::ToolResult { tool_call_id, success, result, .. } => {
                assert_eq!(tool_call_id, "call_1");
                assert!(success);
                assert!(result.contains('4'));
            }
            other => panic!("expected tool_result, got {other:?}"),
        }
        assert_eq!(events[3], StreamEvent::Text { content: "4".into() });
        assert_eq!(summary.tool_calls, 1);
        assert_eq!(summary.iterations, 2);

        // The second model call sees the tool result.
        let second = &provider.requests()[1];
        let tool_msg = second.messages.iter().find(|m| m.role == Role::Tool).unwrap();
        assert_eq!(tool_msg.tool_call_id.as_deref(), Some("call_1"));
    }

    #[tokio::test]
    async fn unreachable_backend_is_error_then_done() {
        let provider = Arc::new(SequentialMockProvider::new(vec![Err(ProviderError::Network(
            "connection refused".into(),
        ))]));
        let agent = AgentLoop::new(provider, scripted_executor(), "mock-model");
        let mut transcript = Transcript::new("sys");

        let (summary, events) = run(&agent, &mut transcript, "hi").await;
        assert_eq!(types(&events), ["error", "done"]);
        assert_eq!(summary.outcome, TurnOutcome::Aborted);
        // User message kept, no assistant reply.
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.last().role, Role::User);
    }

    #[tokio::test]
    async fn malformed_reply_mid_turn_keeps_progress() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            Ok(make_tool_call_response(
                vec![make_tool_call("call_1", "file_list", json!({}))],
                "",
            )),
            Err(ProviderError::MalformedResponse("no choices".into())),
        ]));
        let agent = AgentLoop::new(provider, scripted_executor(), "mock-model");
        let mut transcript = Transcript::new("sys");

        let (summary, events) = run(&agent, &mut transcript, "list files").await;
        assert_eq!(types(&events), ["tool_call", "tool_result", "error", "done"]);
        assert_eq!(summary.outcome, TurnOutcome::Aborted);
        assert!(transcript.tool_result_for("call_1").is_some());
    }

    #[tokio::test]
    async fn cap_stops_runaway_tool_calls() {
        let step = |id: &str| {
            Ok(make_tool_call_response(
                vec![make_tool_call(id, "web_search", json!({"query": "again"}))],
                "",
            ))
        };
        let provider = Arc::new(SequentialMockProvider::new(vec![step("c1"), step("c2"), step("c3")]));
        let counter = ScriptedTools::default();
        let agent = AgentLoop::new(provider.clone(), counter.executor(), "mock-model").with_max_tool_calls(2);
        let mut transcript = Transcript::new("sys");

        let (summary, events) = run(&agent, &mut transcript, "search forever").await;
        assert_eq!(summary.outcome, TurnOutcome::BudgetExceeded);
        assert_eq!(summary.tool_calls, 2);
        assert_eq!(counter.dispatched(), 2);
        assert_eq!(provider.call_count(), 2);
        assert_eq!(
            types(&events),
            ["tool_call", "tool_result", "tool_call", "tool_result", "text", "done"]
        );
        assert_eq!(events[4], StreamEvent::Text { content: budget_message(2) });
    }

    #[tokio::test]
    async fn cap_reached_inside_a_batch() {
        let provider = Arc::new(SequentialMockProvider::new(vec![Ok(make_tool_call_response(
            vec![
                make_tool_call("a", "file_list", json!({})),
                make_tool_call("b", "file_list", json!({})),
                make_tool_call("c", "file_list", json!({})),
            ],
            "",
        ))]));
        let counter = ScriptedTools::default();
        let agent = AgentLoop::new(provider, counter.executor(), "mock-model").with_max_tool_calls(2);
        let mut transcript = Transcript::new("sys");

        let (summary, events) = run(&agent, &mut transcript, "list thrice").await;
        assert_eq!(summary.tool_calls, 2);
        assert_eq!(counter.dispatched(), 2);
        assert_eq!(events.iter().filter(|e| e.event_type() == "tool_call").count(), 2);
        let skipped = transcript.tool_result_for("c").unwrap();
        assert_eq!(skipped.success, Some(false));
        assert_eq!(skipped.content, SKIPPED_OVER_BUDGET);
    }

    #[tokio::test]
    async fn tool_failures_do_not_end_the_turn() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            Ok(make_tool_call_response(
                vec![
                    make_tool_call("bad", "teleport", json!({})),
                    make_tool_call("invalid", "execute_code", json!({"language": "cobol", "code": "x"})),
                ],
                "",
            )),
            Ok(make_text_response("Sorry, that did not work.")),
        ]));
        let agent = AgentLoop::new(provider, scripted_executor(), "mock-model");
        let mut transcript = Transcript::new("sys");

        let (summary, events) = run(&agent, &mut transcript, "do something odd").await;
        assert_eq!(summary.outcome, TurnOutcome::Complete);
        let failures: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::ToolResult { success: false, result, .. } => Some(result.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(failures.len(), 2);
        assert!(failures[0].starts_with("Unknown tool"));
        assert!(failures[1].contains("must be one of"));
    }

    #[tokio::test]
    async fn results_pair_with_calls() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            Ok(make_tool_call_response(
                vec![
                    make_tool_call("x1", "file_list", json!({})),
                    make_tool_call("x2", "web_search", json!({"query": "q"})),
                ],
                "two at once",
            )),
            Ok(make_text_response("done")),
        ]));
        let agent = AgentLoop::new(provider, scripted_executor(), "mock-model");
        let mut transcript = Transcript::new("sys");

        let (_, events) = run(&agent, &mut transcript, "go").await;
        let mut seen_calls = Vec::new();
        for event in &events {
            match event {
                StreamEvent::ToolCall { id, .. } => seen_calls.push(id.clone()),
                StreamEvent::ToolResult { tool_call_id, .. } => assert!(seen_calls.contains(tool_call_id)),
                _ => {}
            }
        }
        assert_eq!(seen_calls, ["x1", "x2"]);

        // Transcript round-trip: the stored result matches what the executor produced.
        for event in &events {
            if let StreamEvent::ToolResult { tool_call_id, result, success, .. } = event {
                let stored = transcript.tool_result_for(tool_call_id).unwrap();
                assert_eq!(&stored.content, result);
                assert_eq!(stored.success, Some(*success));
            }
        }
    }

    #[tokio::test]
    async fn done_is_always_last_and_unique() {
        let scripts: Vec<Vec<Result<_, ProviderError>>> = vec![
            vec![Ok(make_text_response("hi"))],
            vec![Err(ProviderError::Timeout("slow".into()))],
            vec![
                Ok(make_tool_call_response(vec![make_tool_call("t", "file_list", json!({}))], "")),
                Ok(make_text_response("")),
            ],
        ];
        for script in scripts {
            let agent = AgentLoop::new(
                Arc::new(SequentialMockProvider::new(script)),
                scripted_executor(),
                "mock-model",
            );
            let mut transcript = Transcript::new("sys");
            let (_, events) = run(&agent, &mut transcript, "x").await;
            assert_eq!(events.iter().filter(|e| e.is_done()).count(), 1);
            assert!(events.last().unwrap().is_done());
            if let Some(pos) = events.iter().position(|e| e.event_type() == "error") {
                assert_eq!(pos, events.len() - 2);
            }
        }
    }

    #[tokio::test]
    async fn empty_final_answer_still_emitted() {
        let provider = Arc::new(SequentialMockProvider::single_text(""));
        let agent = AgentLoop::new(provider, scripted_executor(), "mock-model");
        let mut transcript = Transcript::new("sys");
        let (summary, events) = run(&agent, &mut transcript, "x").await;
        assert_eq!(types(&events), ["text", "done"]);
        assert_eq!(events[0], StreamEvent::Text { content: String::new() });
        assert_eq!(summary.outcome, TurnOutcome::Complete);
    }

    #[tokio::test]
    async fn commentary_emitted_unless_empty() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            Ok(make_tool_call_response(vec![make_tool_call("a", "file_list", json!({}))], "")),
            Ok(make_tool_call_response(vec![make_tool_call("b", "file_list", json!({}))], " ")),
            Ok(make_text_response("done")),
        ]));
        let agent = AgentLoop::new(provider, scripted_executor(), "mock-model");
        let mut transcript = Transcript::new("sys");
        let (_, events) = run(&agent, &mut transcript, "x").await;
        assert_eq!(
            types(&events),
            ["tool_call", "tool_result", "text", "tool_call", "tool_result", "text", "done"]
        );
        assert_eq!(events[2], StreamEvent::Text { content: " ".into() });
    }

    #[tokio::test]
    async fn dropped_receiver_stops_before_next_model_call() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            Ok(make_tool_call_response(vec![make_tool_call("t", "file_list", json!({}))], "")),
            Ok(make_text_response("never requested")),
        ]));
        let agent = AgentLoop::new(provider.clone(), scripted_executor(), "mock-model");
        let mut transcript = Transcript::new("sys");

        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let summary = agent.run_turn(&mut transcript, "hello?", &tx).await;
        assert_eq!(summary.outcome, TurnOutcome::Disconnected);
        assert_eq!(provider.call_count(), 0);
        assert_eq!(transcript.last().content, "hello?");
    }
}
