//! `ml_inference`: Hugging-Face-Inference-compatible hosted models.

use std::sync::Arc;

use async_trait::async_trait;
use loopclaw_core::error::ToolError;
use loopclaw_core::tool::{Tool, ToolOutput};
use serde_json::{json, Value};

use super::{optional_str, required_str};
use crate::context::ToolContext;
use crate::kind::ToolKind;

pub struct MlInferenceTool {
    ctx: Arc<ToolContext>,
}

impl MlInferenceTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

pub fn default_model(task: &str) -> Option<&'static str> {
    match task {
        "text-classification" | "sentiment-analysis" => {
            Some("distilbert/distilbert-base-uncased-finetuned-sst-2-english")
        }
        "text-generation" => Some("openai-community/gpt2"),
        "summarization" => Some("facebook/bart-large-cnn"),
        "translation" => Some("Helsinki-NLP/opus-mt-en-fr"),
        "question-answering" => Some("deepset/roberta-base-squad2"),
        _ => None,
    }
}

/// Flatten `[[x]]` and `[x]` down to the first object.
fn first_object(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.first().and_then(first_object),
        Value::Object(_) => Some(value),
        _ => None,
    }
}

fn text_field(value: &Value, field: &str) -> Result<String, String> {
    first_object(value)
        .and_then(|o| o[field].as_str())
        .map(str::to_string)
        .ok_or_else(|| format!("response has no '{field}'"))
}

/// Turn a raw endpoint reply into one readable block per task family.
pub fn normalize_inference(task: &str, value: &Value) -> Result<String, String> {
    if let Some(error) = value.get("error") {
        return Err(error.as_str().map(str::to_string).unwrap_or_else(|| error.to_string()));
    }

    match task {
        "text-classification" | "sentiment-analysis" => {
            let scores = match value {
                Value::Array(outer) if outer.first().is_some_and(Value::is_array) => &outer[0],
                other => other,
            };
            let mut ranked: Vec<(String, f64)> = scores
                .as_array()
                .ok_or("expected a list of labels")?
                .iter()
                .filter_map(|s| Some((s["label"].as_str()?.to_string(), s["score"].as_f64()?)))
                .collect();
            if ranked.is_empty() {
                return Err("no labels in response".into());
            }
            ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
            Ok(ranked
                .iter()
                .map(|(label, score)| format!("{label}: {score:.4}"))
                .collect::<Vec<_>>()
                .join("\n"))
        }
        "text-generation" => text_field(value, "generated_text"),
        "summarization" => text_field(value, "summary_text"),
        "translation" => text_field(value, "translation_text"),
        "question-answering" => {
            let obj = first_object(value).ok_or("expected an answer object")?;
            let answer = obj["answer"].as_str().ok_or("response has no 'answer'")?;
            match obj["score"].as_f64() {
                Some(score) => Ok(format!("{answer} (score: {score:.4})")),
                None => Ok(answer.to_string()),
            }
        }
        other => Err(format!("unsupported task '{other}'")),
    }
}

#[async_trait]
impl Tool for MlInferenceTool {
    fn name(&self) -> &str {
        ToolKind::MlInference.name()
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, ToolError> {
        let task = required_str(&arguments, "task")?;
        let input = required_str(&arguments, "input")?;
        let model = match optional_str(&arguments, "model") {
            Some(model) => model,
            None => default_model(task)
                .ok_or_else(|| ToolError::InvalidArguments(format!("no default model for task '{task}'")))?,
        };

        let inputs = if task == "question-answering" {
            let context = optional_str(&arguments, "context").ok_or_else(|| {
                ToolError::InvalidArguments("question-answering needs a 'context'".into())
            })?;
            json!({ "question": input, "context": context })
        } else {
            Value::String(input.to_string())
        };

        let endpoint = format!("{}/{model}", self.ctx.config.inference_url.trim_end_matches('/'));
        let limit = self.ctx.config.timeouts.inference_secs;
        let mut request = self
            .ctx
            .http
            .post(&endpoint)
            .json(&json!({ "inputs": inputs }))
            .timeout(ToolContext::secs(limit));
        if let Some(token) = &self.ctx.config.inference_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ToolError::Timeout {
                    tool_name: self.name().into(),
                    timeout_secs: limit,
                }
            } else {
                ToolError::failed(self.name(), format!("inference endpoint unreachable: {e}"))
            }
        })?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| ToolError::failed(self.name(), format!("bad inference reply (HTTP {status}): {e}")))?;

        Ok(match normalize_inference(task, &body) {
            Ok(text) => ToolOutput::ok(format!("Model: {model}\n{text}")).with_data(body),
            Err(reason) => ToolOutput::failed(format!("Inference failed ({model}): {reason}")),
        })
    }
}
