//! Tool surface declarations: input schemas, validated inputs and the result envelope.
//!
//! # Architecture
//!
//! ```text
//! MCP client → tools/call {name, arguments}
//!            → AskInput / ClearInput (validated once, defaults applied)
//!            → LLMBridge
//!            → ToolResponse {content, session_id, tool_call?}
//! ```
//!
//! # Example
//!
//! ```rust
//! use llmbridge::tool_protocol::AskInput;
//! use serde_json::json;
//!
//! let input = AskInput::from_arguments(&json!({"question": "Why is the sky blue?"})).unwrap();
//! assert_eq!(input.session_id, "default");
//! assert!(input.model.is_none());
//!
//! assert!(AskInput::from_arguments(&json!({"model": "gpt-4o"})).is_err());
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::llmbridge::error::BridgeError;
use crate::llmbridge::normalizer::ToolCall;
use crate::llmbridge::provider::Provider;
use crate::llmbridge::session_resolver::DEFAULT_SESSION_ID;

/// Name of the tool that forgets a session.
pub const CLEAR_SESSION_TOOL: &str = "clear_session";

/// Defines the type of a tool parameter
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ToolParameterType {
    String,
    Array,
    Object,
}

/// Defines a parameter for a tool
#[derive(Debug, Clone, Serialize)]
pub struct ToolParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ToolParameterType,
    pub description: Option<String>,
    pub required: bool,
    pub default: Option<Value>,
    /// For array types, specifies the type of items
    pub items: Option<Box<ToolParameterType>>,
}

impl ToolParameter {
    /// Define a new tool parameter with the provided name and type.
    pub fn new(name: impl Into<String>, param_type: ToolParameterType) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: None,
            required: false,
            default: None,
            items: None,
        }
    }

    /// Add a human readable description that will surface in generated schemas.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark the argument as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Document the value used when the caller omits the parameter.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// For array parameters, declare the type of the contained items.
    pub fn with_items(mut self, item_type: ToolParameterType) -> Self {
        self.items = Some(Box::new(item_type));
        self
    }

    fn to_schema(&self) -> Value {
        let mut schema = json!({ "type": self.param_type });
        if let Some(description) = &self.description {
            schema["description"] = json!(description);
        }
        if let Some(default) = &self.default {
            schema["default"] = default.clone();
        }
        if let Some(items) = &self.items {
            schema["items"] = json!({ "type": items });
        }
        schema
    }
}

/// Metadata about a tool
#[derive(Debug, Clone, Serialize)]
pub struct ToolMetadata {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ToolParameter>,
}

impl ToolMetadata {
    /// Create metadata with the supplied identifier and description.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    /// Append a parameter definition to the tool metadata.
    pub fn with_parameter(mut self, param: ToolParameter) -> Self {
        self.parameters.push(param);
        self
    }

    /// JSON Schema for the tool's arguments object.
    pub fn to_input_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for param in &self.parameters {
            properties.insert(param.name.clone(), param.to_schema());
            if param.required {
                required.push(json!(param.name));
            }
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// The entry advertised by `tools/list`.
    pub fn to_mcp_tool(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.to_input_schema(),
        })
    }
}

fn session_id_parameter(description: &str) -> ToolParameter {
    ToolParameter::new("session_id", ToolParameterType::String)
        .with_description(description)
        .with_default(json!(DEFAULT_SESSION_ID))
}

/// Metadata of the `ask_*` tool for `provider`.
pub fn ask_tool_metadata(provider: Provider, default_model: &str) -> ToolMetadata {
    ToolMetadata::new(
        provider.tool_name(),
        format!(
            "Ask {} a question. Conversation context is kept per session_id; the response \
             includes the session_id to pass back to continue the same conversation.",
            provider
        ),
    )
    .with_parameter(
        ToolParameter::new("question", ToolParameterType::String)
            .with_description("The question or prompt to send.")
            .required(),
    )
    .with_parameter(
        ToolParameter::new("model", ToolParameterType::String)
            .with_description(format!("{} model to use.", provider))
            .with_default(json!(default_model)),
    )
    .with_parameter(
        ToolParameter::new("tools", ToolParameterType::Array)
            .with_description(format!(
                "Optional tool definitions in {}'s native format, forwarded verbatim.",
                provider
            ))
            .with_items(ToolParameterType::Object),
    )
    .with_parameter(session_id_parameter(
        "Session to continue. Omit or pass \"default\" to start a new conversation.",
    ))
}

/// Metadata of the `clear_session` tool.
pub fn clear_tool_metadata() -> ToolMetadata {
    ToolMetadata::new(
        CLEAR_SESSION_TOOL,
        "Forget the conversation history stored for a session.",
    )
    .with_parameter(session_id_parameter("Session whose history should be cleared."))
}

#[derive(Deserialize)]
struct RawAskArguments {
    question: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    tools: Option<Value>,
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Deserialize)]
struct RawClearArguments {
    #[serde(default)]
    session_id: Option<String>,
}

/// Validated arguments of an `ask_*` tool.
#[derive(Debug, Clone, PartialEq)]
pub struct AskInput {
    pub question: String,
    /// `None` selects the provider's default model.
    pub model: Option<String>,
    /// Tool definitions forwarded verbatim to the provider.
    pub tools: Option<Value>,
    /// As supplied by the caller, `"default"` when omitted.
    pub session_id: String,
}

impl AskInput {
    pub fn new(question: impl Into<String>) -> Self {
        AskInput {
            question: question.into(),
            model: None,
            tools: None,
            session_id: DEFAULT_SESSION_ID.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_tools(mut self, tools: Value) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    /// Validate raw `tools/call` arguments and apply defaults.
    pub fn from_arguments(arguments: &Value) -> Result<Self, BridgeError> {
        let raw: RawAskArguments = parse_arguments(arguments)?;

        let question = raw
            .question
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| {
                BridgeError::InvalidInput("question is required and must be non-empty".into())
            })?;

        Ok(AskInput {
            question,
            model: raw.model.filter(|m| !m.trim().is_empty()),
            tools: raw.tools,
            session_id: raw
                .session_id
                .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string()),
        })
    }
}

/// Validated arguments of `clear_session`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClearInput {
    pub session_id: String,
}

impl ClearInput {
    pub fn from_arguments(arguments: &Value) -> Result<Self, BridgeError> {
        let raw: RawClearArguments = parse_arguments(arguments)?;
        Ok(ClearInput {
            session_id: raw
                .session_id
                .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string()),
        })
    }
}

fn parse_arguments<T: for<'de> Deserialize<'de>>(arguments: &Value) -> Result<T, BridgeError> {
    let arguments = match arguments {
        Value::Null => json!({}),
        Value::Object(_) => arguments.clone(),
        _ => {
            return Err(BridgeError::InvalidInput(
                "arguments must be a JSON object".into(),
            ))
        }
    };
    serde_json::from_value(arguments).map_err(|err| BridgeError::InvalidInput(err.to_string()))
}

/// One MCP content block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock {
            kind: "text".to_string(),
            text: text.into(),
        }
    }
}

/// The uniform result envelope of every tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResponse {
    pub content: Vec<ContentBlock>,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCall>,
}

impl ToolResponse {
    /// Envelope for an answered question.
    pub fn answer(answer: &str, session_id: &str, tool_call: Option<ToolCall>) -> Self {
        let mut content = vec![ContentBlock::text(format!(
            "{}\n\n---\nsession_id: {}\nPass this session_id on your next call to continue \
             this conversation, or omit it to start a new one.",
            answer, session_id
        ))];
        if let Some(call) = &tool_call {
            let serialized =
                serde_json::to_string_pretty(call).unwrap_or_else(|_| "{}".to_string());
            content.push(ContentBlock::text(format!(
                "Tool call ({}):\n{}",
                call.source.as_str(),
                serialized
            )));
        }
        ToolResponse {
            content,
            session_id: session_id.to_string(),
            tool_call,
        }
    }

    /// Envelope confirming a cleared session.
    pub fn cleared(session_id: &str) -> Self {
        ToolResponse {
            content: vec![ContentBlock::text(format!(
                "Conversation history for session {} has been cleared.",
                session_id
            ))],
            session_id: session_id.to_string(),
            tool_call: None,
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| json!({}))
    }
}
