//! Tool trait and the tool invocation contract.
//!
//! A [`ToolSpec`] is the static declaration advertised to the model. A
//! [`ToolCall`] is the model's request to run one, and a [`ToolResult`] is
//! what always comes back, whether the handler succeeded, failed, or was
//! never reached.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ToolError;
use crate::message::MessageToolCall;
use crate::provider::ToolDefinition;

/// A request to execute a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the model's tool_call.id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    pub arguments: Value,
}

impl From<&MessageToolCall> for ToolCall {
    /// Blank argument strings mean "no arguments". Anything that does not
    /// parse is kept as a raw string so validation can reject it.
    fn from(call: &MessageToolCall) -> Self {
        let raw = call.arguments.trim();
        let arguments = if raw.is_empty() {
            Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(call.arguments.clone()))
        };
        Self {
            id: call.id.clone(),
            name: call.name.clone(),
            arguments,
        }
    }
}

/// What a handler produces before the executor stamps it.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub success: bool,
    pub output: String,
    pub data: Option<Value>,
}

impl ToolOutput {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            data: None,
        }
    }

    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// The result of one tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call ID this result is for
    pub call_id: String,

    /// Which tool ran (or was asked for)
    pub tool_name: String,

    /// Whether the tool executed successfully
    pub success: bool,

    /// Human and model readable output
    pub output: String,

    /// Optional structured data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Wall-clock duration, dispatch to return
    pub duration_ms: u64,
}

/// JSON schema type of a declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Object => "object",
            ParamType::Array => "array",
        }
    }
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    #[serde(rename = "type")]
    pub kind: ParamType,

    pub description: String,

    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParamSpec {
    pub fn new(kind: ParamType, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            enum_values: Vec::new(),
            default: None,
        }
    }

    pub fn string(description: impl Into<String>) -> Self {
        Self::new(ParamType::String, description)
    }

    pub fn integer(description: impl Into<String>) -> Self {
        Self::new(ParamType::Integer, description)
    }

    pub fn boolean(description: impl Into<String>) -> Self {
        Self::new(ParamType::Boolean, description)
    }

    pub fn object(description: impl Into<String>) -> Self {
        Self::new(ParamType::Object, description)
    }

    /// Restrict a string parameter to a fixed set of values.
    pub fn one_of(mut self, values: &[&str]) -> Self {
        self.enum_values = values.iter().map(|v| v.to_string()).collect();
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// The parameter block of a catalog entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSchema {
    pub properties: BTreeMap<String, ParamSpec>,
    pub required: Vec<String>,
}

impl ParameterSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, name: &str, spec: ParamSpec) -> Self {
        self.properties.insert(name.to_string(), spec);
        self.required.push(name.to_string());
        self
    }

    pub fn optional(mut self, name: &str, spec: ParamSpec) -> Self {
        self.properties.insert(name.to_string(), spec);
        self
    }

    /// Render as a JSON Schema object.
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": self.properties,
            "required": self.required,
        })
    }
}

/// A static catalog entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: ParameterSchema,
}

impl ToolSpec {
    pub fn new(name: &str, description: &str, parameters: ParameterSchema) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        }
    }

    /// Convert into the definition sent to the model.
    pub fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters.to_json(),
        }
    }
}

/// A tool handler.
///
/// Handlers receive arguments that already passed schema validation (defaults
/// filled in). They bound their own blocking time and report expected
/// failures such as a non-zero exit code through [`ToolOutput::failed`];
/// a returned [`ToolError`] is folded into a failed result by the executor.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The catalog name this handler serves (e.g., "run_shell").
    fn name(&self) -> &str;

    async fn execute(&self, arguments: Value) -> std::result::Result<ToolOutput, ToolError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_renders_as_json_schema() {
        let schema = ParameterSchema::new()
            .required(
                "language",
                ParamSpec::string("Interpreter").one_of(&["python", "javascript", "bash"]),
            )
            .optional("timeout", ParamSpec::integer("Seconds").with_default(30));
        let json = schema.to_json();

        assert_eq!(json["type"], "object");
        assert_eq!(json["required"], serde_json::json!(["language"]));
        assert_eq!(json["properties"]["language"]["type"], "string");
        assert_eq!(json["properties"]["language"]["enum"][1], "javascript");
        assert_eq!(json["properties"]["timeout"]["default"], 30);
        assert!(json["properties"]["timeout"].get("enum").is_none());
    }

    #[test]
    fn spec_to_definition() {
        let spec = ToolSpec::new(
            "web_search",
            "Search the web",
            ParameterSchema::new().required("query", ParamSpec::string("Query")),
        );
        let def = spec.to_definition();
        assert_eq!(def.name, "web_search");
        assert_eq!(def.parameters["properties"]["query"]["description"], "Query");
    }

    #[test]
    fn tool_call_from_message_parses_arguments() {
        let call = ToolCall::from(&MessageToolCall {
            id: "c1".into(),
            name: "execute_code".into(),
            arguments: r#"{"language":"python","code":"print(2+2)"}"#.into(),
        });
        assert_eq!(call.arguments["language"], "python");
    }

    #[test]
    fn tool_call_from_message_handles_blank_and_garbage() {
        let blank = ToolCall::from(&MessageToolCall {
            id: "c1".into(),
            name: "file_list".into(),
            arguments: "  ".into(),
        });
        assert!(blank.arguments.as_object().unwrap().is_empty());

        let garbage = ToolCall::from(&MessageToolCall {
            id: "c2".into(),
            name: "file_list".into(),
            arguments: "{not json".into(),
        });
        assert_eq!(garbage.arguments, Value::String("{not json".into()));
    }

    #[test]
    fn tool_output_builders() {
        let out = ToolOutput::ok("done").with_data(serde_json::json!({"n": 1}));
        assert!(out.success);
        assert_eq!(out.data.unwrap()["n"], 1);
        assert!(!ToolOutput::failed("nope").success);
    }
}
