//! Argument validation against a declared [`ParameterSchema`].
//!
//! Runs before every dispatch. All problems are collected so the model sees
//! the complete list in one failed result instead of fixing them one by one.

use serde_json::{Map, Value};

use crate::error::ToolError;
use crate::tool::{ParamType, ParameterSchema};

/// One problem found in a set of arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentIssue {
    pub param: String,
    pub problem: String,
}

impl std::fmt::Display for ArgumentIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}' {}", self.param, self.problem)
    }
}

/// Check `arguments` against `schema` and return them with defaults filled in.
///
/// Undeclared keys pass through untouched. Integer parameters accept whole
/// floats (`30.0`) and normalize them to integers.
pub fn validate_arguments(schema: &ParameterSchema, arguments: &Value) -> Result<Value, Vec<ArgumentIssue>> {
    let Some(input) = arguments.as_object() else {
        return Err(vec![ArgumentIssue {
            param: "arguments".into(),
            problem: format!("must be a JSON object, got {}", describe(arguments)),
        }]);
    };

    let mut issues = Vec::new();
    let mut output: Map<String, Value> = input.clone();

    for name in &schema.required {
        match input.get(name) {
            None | Some(Value::Null) => issues.push(ArgumentIssue {
                param: name.clone(),
                problem: "is required".into(),
            }),
            Some(_) => {}
        }
    }

    for (name, spec) in &schema.properties {
        let value = match input.get(name) {
            Some(Value::Null) | None => {
                if let Some(default) = &spec.default {
                    output.insert(name.clone(), default.clone());
                }
                continue;
            }
            Some(v) => v,
        };

        match coerce(spec.kind, value) {
            Some(v) => {
                if !spec.enum_values.is_empty() {
                    let allowed = v.as_str().is_some_and(|s| spec.enum_values.iter().any(|e| e == s));
                    if !allowed {
                        issues.push(ArgumentIssue {
                            param: name.clone(),
                            problem: format!("must be one of [{}]", spec.enum_values.join(", ")),
                        });
                        continue;
                    }
                }
                output.insert(name.clone(), v);
            }
            None => issues.push(ArgumentIssue {
                param: name.clone(),
                problem: format!("must be of type {}, got {}", spec.kind.as_str(), describe(value)),
            }),
        }
    }

    if issues.is_empty() {
        Ok(Value::Object(output))
    } else {
        Err(issues)
    }
}

/// Fold a list of issues into the tool error the executor reports.
pub fn into_tool_error(issues: &[ArgumentIssue]) -> ToolError {
    let joined = issues.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ");
    ToolError::InvalidArguments(joined)
}

fn coerce(kind: ParamType, value: &Value) -> Option<Value> {
    let ok = match kind {
        ParamType::String => value.is_string(),
        ParamType::Integer => {
            if value.is_i64() || value.is_u64() {
                true
            } else {
                let f = value.as_f64()?;
                if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                    return Some(Value::from(f as i64));
                }
                false
            }
        }
        ParamType::Number => value.is_number(),
        ParamType::Boolean => value.is_boolean(),
        ParamType::Object => value.is_object(),
        ParamType::Array => value.is_array(),
    };
    ok.then(|| value.clone())
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
