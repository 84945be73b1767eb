//! OpenAI-compatible model gateway.
//!
//! Works with Ollama (the default), llama.cpp server, vLLM, LM Studio, and
//! any endpoint exposing `/v1/chat/completions` with function calling.
//!
//! Failures are split the way the agent loop cares about: transport problems
//! and error statuses are "unavailable", a 200 whose body cannot be turned
//! into a reply is "malformed" (see [`ProviderError::class`]).

use std::time::Duration;

use async_trait::async_trait;
use loopclaw_config::ProviderConfig;
use loopclaw_core::error::ProviderError;
use loopclaw_core::message::{Message, MessageToolCall, Role};
use loopclaw_core::provider::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// An OpenAI-compatible chat-completions client.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new client with the given request timeout.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            client,
        })
    }

    /// Create an Ollama client (convenience constructor).
    pub fn ollama(base_url: Option<&str>) -> Result<Self, ProviderError> {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            None,
            Duration::from_secs(120),
        )
    }

    /// Build from the `[provider]` config section.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        Self::new(
            config.name.clone(),
            config.base_url.clone(),
            config.api_key.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// Convert transcript messages to the wire format.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: match m.role {
                    Role::User => "user".into(),
                    Role::Assistant => "assistant".into(),
                    Role::System => "system".into(),
                    Role::Tool => "tool".into(),
                },
                content: Some(m.content.clone()),
                tool_calls: if m.tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        m.tool_calls
                            .iter()
                            .map(|tc| ApiToolCall {
                                id: Some(tc.id.clone()),
                                r#type: Some("function".into()),
                                function: ApiFunction {
                                    name: tc.name.clone(),
                                    arguments: serde_json::Value::String(tc.arguments.clone()),
                                },
                            })
                            .collect(),
                    )
                },
                tool_call_id: m.tool_call_id.clone(),
            })
            .collect()
    }

    /// Convert tool definitions to the wire format.
    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    fn request_body(request: &ProviderRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
            "stream": false,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
        }

        body
    }
}

fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

/// Turn a chat-completions body into a reply.
///
/// Tool-call arguments are accepted as a JSON string or an inline object.
/// A call without an id gets a generated one; a call without a function
/// name makes the whole reply malformed.
pub fn parse_completion(body: &str) -> Result<ProviderResponse, ProviderError> {
    let api_response: ApiResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::MalformedResponse(format!("Failed to parse response: {e}")))?;

    let choice = api_response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::MalformedResponse("No choices in response".into()))?;

    let mut tool_calls = Vec::new();
    for tc in choice.message.tool_calls.unwrap_or_default() {
        if tc.function.name.trim().is_empty() {
            return Err(ProviderError::MalformedResponse(
                "Tool call without a function name".into(),
            ));
        }
        let id = tc
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple()));
        let arguments = match tc.function.arguments {
            serde_json::Value::String(s) => s,
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        };
        tool_calls.push(MessageToolCall {
            id,
            name: tc.function.name,
            arguments,
        });
    }

    let message = Message::assistant_with_calls(choice.message.content.unwrap_or_default(), tool_calls);

    let usage = api_response.usage.map(|u| Usage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    });

    Ok(ProviderResponse {
        message,
        usage,
        model: api_response.model,
    })
}

#[async_trait]
impl loopclaw_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::request_body(&request);

        debug!(
            provider = %self.name,
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending completion request"
        );

        let response = self
            .authorize(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status == 404 {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ModelNotFound(format!("{}: {error_body}", request.model)));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let text = response.text().await.map_err(|e| {
            ProviderError::MalformedResponse(format!("Failed to read response body: {e}"))
        })?;

        parse_completion(&text)
    }

    async fn list_models(&self) -> std::result::Result<Vec<String>, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Ok(Vec::new());
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        let models = body["data"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|m| m["id"].as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        Ok(models)
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(transport_error)?;

        Ok(response.status().is_success())
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    r#type: Option<String>,
    function: ApiFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    #[serde(default)]
    name: String,
    /// A JSON string per the OpenAI schema; some local servers send an object.
    #[serde(default)]
    arguments: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use loopclaw_core::error::GatewayFailure;
    use loopclaw_core::{Provider, ToolResult};

    #[test]
    fn ollama_constructor() {
        let provider = OpenAiCompatProvider::ollama(None).unwrap();
        assert_eq!(provider.name(), "ollama");
        assert!(provider.base_url().contains("localhost:11434"));
    }

    #[test]
    fn from_config_trims_trailing_slash() {
        let config = ProviderConfig {
            base_url: "http://gpu-box:8000/v1/".into(),
            ..ProviderConfig::default()
        };
        let provider = OpenAiCompatProvider::from_config(&config).unwrap();
        assert_eq!(provider.base_url(), "http://gpu-box:8000/v1");
    }

    #[test]
    fn message_conversion() {
        let messages = vec![Message::system("You are helpful"), Message::user("Hello")];
        let api_messages = OpenAiCompatProvider::to_api_messages(&messages);
        assert_eq!(api_messages.len(), 2);
        assert_eq!(api_messages[0].role, "system");
        assert_eq!(api_messages[1].role, "user");
    }

    #[test]
    fn message_conversion_with_tool_calls_and_results() {
        let call = MessageToolCall {
            id: "call_1".into(),
            name: "execute_code".into(),
            arguments: r#"{"language":"python","code":"print(2+2)"}"#.into(),
        };
        let result = ToolResult {
            call_id: "call_1".into(),
            tool_name: "execute_code".into(),
            success: true,
            output: "4".into(),
            data: None,
            duration_ms: 40,
        };
        let messages = vec![
            Message::assistant_with_calls("", vec![call]),
            Message::tool_result(&result),
        ];
        let api = OpenAiCompatProvider::to_api_messages(&messages);

        let calls = api[0].tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.name, "execute_code");
        assert!(calls[0].function.arguments.is_string());
        assert_eq!(api[1].role, "tool");
        assert_eq!(api[1].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(api[1].content.as_deref(), Some("4"));
    }

    #[test]
    fn request_body_carries_catalog() {
        let request = ProviderRequest {
            model: "llama3.1".into(),
            messages: vec![Message::user("hi")],
            temperature: 0.2,
            max_tokens: Some(256),
            tools: vec![ToolDefinition {
                name: "web_search".into(),
                description: "Search".into(),
                parameters: serde_json::json!({"type": "object"}),
            }],
        };
        let body = OpenAiCompatProvider::request_body(&request);
        assert_eq!(body["stream"], false);
        assert_eq!(body["max_tokens"], 256);
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "web_search");
    }

    #[test]
    fn parse_text_reply() {
        let body = r#"{
            "model": "llama3.1",
            "choices": [{"message": {"role": "assistant", "content": "4"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 1, "total_tokens": 11}
        }"#;
        let reply = parse_completion(body).unwrap();
        assert_eq!(reply.message.role, Role::Assistant);
        assert_eq!(reply.message.content, "4");
        assert!(reply.message.tool_calls.is_empty());
        assert_eq!(reply.usage.unwrap().total_tokens, 11);
    }

    #[test]
    fn parse_tool_call_reply_with_string_arguments() {
        let body = r#"{
            "model": "llama3.1",
            "choices": [{"message": {"role": "assistant", "content": null, "tool_calls": [
                {"id": "call_a", "type": "function",
                 "function": {"name": "execute_code", "arguments": "{\"language\":\"python\",\"code\":\"print(2+2)\"}"}}
            ]}}]
        }"#;
        let reply = parse_completion(body).unwrap();
        assert_eq!(reply.message.content, "");
        let tc = &reply.message.tool_calls[0];
        assert_eq!(tc.id, "call_a");
        let args: serde_json::Value = serde_json::from_str(&tc.arguments).unwrap();
        assert_eq!(args["code"], "print(2+2)");
    }

    #[test]
    fn parse_tool_call_with_object_arguments_and_no_id() {
        let body = r#"{
            "model": "qwen2.5",
            "choices": [{"message": {"role": "assistant", "content": "", "tool_calls": [
                {"function": {"name": "web_search", "arguments": {"query": "rust"}}},
                {"function": {"name": "web_search", "arguments": {"query": "tokio"}}}
            ]}}]
        }"#;
        let reply = parse_completion(body).unwrap();
        let calls = &reply.message.tool_calls;
        assert_eq!(calls.len(), 2);
        assert!(calls[0].id.starts_with("call_"));
        assert_ne!(calls[0].id, calls[1].id);
        let args: serde_json::Value = serde_json::from_str(&calls[0].arguments).unwrap();
        assert_eq!(args["query"], "rust");
    }

    #[test]
    fn parse_malformed_replies() {
        for body in [
            "not json",
            r#"{"model": "m", "choices": []}"#,
            r#"{"model": "m", "choices": [{"message": {"role": "assistant", "tool_calls": [{"function": {"name": ""}}]}}]}"#,
        ] {
            let err = parse_completion(body).unwrap_err();
            assert_eq!(err.class(), GatewayFailure::Malformed, "body: {body}");
        }
    }

    #[tokio::test]
    async fn unreachable_backend_is_unavailable() {
        let provider = OpenAiCompatProvider::new(
            "ollama",
            "http://127.0.0.1:9/v1",
            None,
            Duration::from_secs(5),
        )
        .unwrap();
        let request = ProviderRequest {
            model: "llama3.1".into(),
            messages: vec![Message::user("hi")],
            temperature: 0.7,
            max_tokens: None,
            tools: vec![],
        };
        let err = provider.complete(request).await.unwrap_err();
        assert_eq!(err.class(), GatewayFailure::Unavailable);
    }
}
