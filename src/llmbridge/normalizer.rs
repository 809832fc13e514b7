//! Provider-agnostic tool-call extraction.
//!
//! Providers describe a requested function invocation in several incompatible ways. The
//! [`extract`] function runs an ordered table of matchers over a raw response and returns
//! the first hit as a canonical [`ToolCall`]:
//!
//! | # | Shape                                                          | [`ToolCallSource`]       |
//! |---|----------------------------------------------------------------|--------------------------|
//! | 1 | `message.function_call {name, arguments}`                      | `FunctionCall`           |
//! | 2 | `message.tool_call {name, arguments \| args}`                  | `ToolCall`               |
//! | 3 | `message.metadata.tool_call`                                   | `MetadataToolCall`       |
//! | 4 | `message.tool_calls[0].function {name, arguments}`             | `ToolCalls`              |
//! | 5 | first `message.content[]` block with `type == "tool_use"`      | `ToolUse`                |
//! | 6 | first `candidates[0].content.parts[]` with a function call     | `CandidateFunctionCall`  |
//!
//! `message` is `choices[0].message` for chat-completions responses and the response object
//! itself otherwise. A response matching several shapes yields only the earliest one.
//!
//! ```rust
//! use llmbridge::normalizer::{extract, ToolCallSource};
//! use serde_json::json;
//!
//! let raw = json!({"function_call": {"name": "doThing", "arguments": "{\"x\":1}"}});
//! let call = extract(&raw).unwrap();
//! assert_eq!(call.source, ToolCallSource::FunctionCall);
//! assert_eq!(call.name.as_deref(), Some("doThing"));
//! assert_eq!(call.args, Some(json!({"x": 1})));
//!
//! assert!(extract(&json!({"content": "just text"})).is_none());
//! ```

use serde::Serialize;
use serde_json::Value;

/// Which provider-specific shape a [`ToolCall`] was recognised from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallSource {
    FunctionCall,
    ToolCall,
    MetadataToolCall,
    ToolCalls,
    ToolUse,
    CandidateFunctionCall,
}

impl ToolCallSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolCallSource::FunctionCall => "function_call",
            ToolCallSource::ToolCall => "tool_call",
            ToolCallSource::MetadataToolCall => "metadata_tool_call",
            ToolCallSource::ToolCalls => "tool_calls",
            ToolCallSource::ToolUse => "tool_use",
            ToolCallSource::CandidateFunctionCall => "candidate_function_call",
        }
    }
}

/// A canonical description of a tool invocation requested by a model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCall {
    pub source: ToolCallSource,
    pub name: Option<String>,
    /// Parsed arguments. `None` when absent or when a JSON string failed to parse.
    pub args: Option<Value>,
    /// The provider fragment the call was read from.
    pub raw: Value,
}

/// Answer text plus the tool call found in the same response, if any.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedResult {
    pub answer: String,
    pub tool_call: Option<ToolCall>,
}

/// Pair the provider's answer text with the tool call extracted from `raw`.
pub fn normalize(answer: impl Into<String>, raw: &Value) -> NormalizedResult {
    NormalizedResult {
        answer: answer.into(),
        tool_call: extract(raw),
    }
}

type Matcher = fn(message: &Value, raw: &Value) -> Option<ToolCall>;

/// Matchers in priority order.
const MATCHERS: [(ToolCallSource, Matcher); 6] = [
    (ToolCallSource::FunctionCall, match_function_call),
    (ToolCallSource::ToolCall, match_tool_call),
    (ToolCallSource::MetadataToolCall, match_metadata_tool_call),
    (ToolCallSource::ToolCalls, match_tool_calls),
    (ToolCallSource::ToolUse, match_tool_use),
    (ToolCallSource::CandidateFunctionCall, match_candidate_function_call),
];

/// Extract the first recognised tool call from a raw provider response.
pub fn extract(raw: &Value) -> Option<ToolCall> {
    let message = message_of(raw);
    MATCHERS.iter().find_map(|(source, matcher)| {
        let call = matcher(message, raw)?;
        log::debug!("normalizer::extract(...): matched {}", source.as_str());
        Some(call)
    })
}

/// `choices[0].message` when present, else the response itself.
fn message_of(raw: &Value) -> &Value {
    match raw.pointer("/choices/0/message") {
        Some(message) if message.is_object() => message,
        _ => raw,
    }
}

fn object_field<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value.get(key).filter(|v| v.is_object())
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Arguments may arrive as a JSON-encoded string or as structured JSON.
fn parse_args(value: Option<&Value>) -> Option<Value> {
    match value? {
        Value::Null => None,
        Value::String(text) => match serde_json::from_str(text) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                log::warn!(
                    "normalizer::parse_args(...): tool arguments are not valid JSON: {}",
                    err
                );
                None
            }
        },
        other => Some(other.clone()),
    }
}

fn match_function_call(message: &Value, _raw: &Value) -> Option<ToolCall> {
    let call = object_field(message, "function_call")?;
    Some(ToolCall {
        source: ToolCallSource::FunctionCall,
        name: string_field(call, "name"),
        args: parse_args(call.get("arguments")),
        raw: call.clone(),
    })
}

fn generic_tool_call(call: &Value, source: ToolCallSource) -> ToolCall {
    let args = call
        .get("arguments")
        .or_else(|| call.get("args"))
        .unwrap_or(call);
    ToolCall {
        source,
        name: string_field(call, "name"),
        args: parse_args(Some(args)),
        raw: call.clone(),
    }
}

fn match_tool_call(message: &Value, _raw: &Value) -> Option<ToolCall> {
    let call = object_field(message, "tool_call")?;
    Some(generic_tool_call(call, ToolCallSource::ToolCall))
}

fn match_metadata_tool_call(message: &Value, _raw: &Value) -> Option<ToolCall> {
    let metadata = object_field(message, "metadata")?;
    let call = object_field(metadata, "tool_call")?;
    Some(generic_tool_call(call, ToolCallSource::MetadataToolCall))
}

fn match_tool_calls(message: &Value, _raw: &Value) -> Option<ToolCall> {
    let first = message.get("tool_calls")?.as_array()?.first()?;
    let function = object_field(first, "function");

    let name = function
        .and_then(|f| string_field(f, "name"))
        .or_else(|| string_field(first, "name"));
    let args = function
        .and_then(|f| f.get("arguments"))
        .or_else(|| first.get("args"))
        .or_else(|| first.get("arguments"));

    Some(ToolCall {
        source: ToolCallSource::ToolCalls,
        name,
        args: parse_args(args),
        raw: first.clone(),
    })
}

fn match_tool_use(message: &Value, _raw: &Value) -> Option<ToolCall> {
    let block = message
        .get("content")?
        .as_array()?
        .iter()
        .find(|block| block.get("type").and_then(Value::as_str) == Some("tool_use"))?;
    Some(ToolCall {
        source: ToolCallSource::ToolUse,
        name: string_field(block, "name"),
        args: parse_args(block.get("input")),
        raw: block.clone(),
    })
}

fn match_candidate_function_call(_message: &Value, raw: &Value) -> Option<ToolCall> {
    let call = raw
        .pointer("/candidates/0/content/parts")?
        .as_array()?
        .iter()
        .find_map(|part| {
            object_field(part, "function_call").or_else(|| object_field(part, "functionCall"))
        })?;
    let args = call.get("args").or_else(|| call.get("arguments"));
    Some(ToolCall {
        source: ToolCallSource::CandidateFunctionCall,
        name: string_field(call, "name"),
        args: parse_args(args),
        raw: call.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_of_prefers_first_choice() {
        let raw = json!({"choices": [{"message": {"content": "hi"}}]});
        assert_eq!(message_of(&raw), &json!({"content": "hi"}));
        let raw = json!({"content": []});
        assert_eq!(message_of(&raw), &raw);
    }

    #[test]
    fn parse_args_handles_each_kind() {
        assert_eq!(parse_args(None), None);
        assert_eq!(parse_args(Some(&Value::Null)), None);
        assert_eq!(parse_args(Some(&json!("{\"a\":true}"))), Some(json!({"a": true})));
        assert_eq!(parse_args(Some(&json!("{oops"))), None);
        assert_eq!(parse_args(Some(&json!({"b": 2}))), Some(json!({"b": 2})));
    }

    #[test]
    fn matcher_table_order_is_fixed() {
        let order: Vec<&str> = MATCHERS.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(
            order,
            vec![
                "function_call",
                "tool_call",
                "metadata_tool_call",
                "tool_calls",
                "tool_use",
                "candidate_function_call"
            ]
        );
    }
}
