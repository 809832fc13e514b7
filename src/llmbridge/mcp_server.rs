//! MCP Server
//!
//! Exposes an [`LLMBridge`] as MCP tools over newline-delimited JSON-RPC 2.0 on stdio.
//!
//! # Architecture
//!
//! ```text
//! MCP client (stdin)
//!         ↓
//! McpServer::handle_request   initialize | ping | tools/list | tools/call
//!         ↓
//! LLMBridge (ask_openai, ask_claude, ask_gemini, ask_grok, clear_session)
//!         ↓
//! MCP client (stdout)
//! ```
//!
//! Requests are handled concurrently; responses are written by a single writer task in
//! completion order. Logging goes to stderr so stdout carries protocol traffic only.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use crate::llmbridge::bridge::LLMBridge;
use crate::llmbridge::error::BridgeError;
use crate::llmbridge::provider::Provider;
use crate::llmbridge::tool_protocol::{
    ask_tool_metadata, clear_tool_metadata, AskInput, ClearInput, ToolMetadata, ToolResponse,
    CLEAR_SESSION_TOOL,
};

/// MCP protocol revision advertised when the client does not request one.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;

/// Routes MCP requests to the bridge.
///
/// Cheap to clone; clones share the same bridge and therefore the same sessions.
#[derive(Clone)]
pub struct McpServer {
    bridge: Arc<LLMBridge>,
}

impl McpServer {
    pub fn new(bridge: Arc<LLMBridge>) -> Self {
        McpServer { bridge }
    }

    pub fn bridge(&self) -> &LLMBridge {
        &self.bridge
    }

    /// Metadata for every tool the server exposes.
    pub fn list_tools(&self) -> Vec<ToolMetadata> {
        let mut tools: Vec<ToolMetadata> = Provider::ALL
            .iter()
            .map(|&provider| {
                let model = self.bridge.default_model(provider).unwrap_or_default();
                ask_tool_metadata(provider, model)
            })
            .collect();
        tools.push(clear_tool_metadata());
        tools
    }

    /// Validate `arguments` for `tool_name` and run the tool.
    pub async fn call_tool(
        &self,
        tool_name: &str,
        arguments: &Value,
    ) -> Result<ToolResponse, BridgeError> {
        if tool_name == CLEAR_SESSION_TOOL {
            let input = ClearInput::from_arguments(arguments)?;
            return Ok(self.bridge.clear(input));
        }

        let provider = Provider::from_tool_name(tool_name)
            .ok_or_else(|| BridgeError::UnknownTool(tool_name.to_string()))?;
        let input = AskInput::from_arguments(arguments)?;
        self.bridge.ask(provider, input).await
    }

    /// Handle one JSON-RPC message. Notifications produce no response.
    pub async fn handle_request(&self, request: Value) -> Option<Value> {
        let id = request.get("id").cloned();
        let method = match request.get("method").and_then(Value::as_str) {
            Some(method) => method,
            None => {
                return Some(error_response(
                    id.unwrap_or(Value::Null),
                    INVALID_REQUEST,
                    "missing method",
                ))
            }
        };

        // Notifications (no id) never get a reply.
        let id = match id {
            Some(id) => id,
            None => {
                log::debug!("McpServer::handle_request(...): notification {}", method);
                return None;
            }
        };

        let params = request.get("params").cloned().unwrap_or(Value::Null);
        let response = match method {
            "initialize" => success_response(id, self.initialize_result(&params)),
            "ping" => success_response(id, json!({})),
            "tools/list" => {
                let tools: Vec<Value> = self.list_tools().iter().map(|t| t.to_mcp_tool()).collect();
                success_response(id, json!({ "tools": tools }))
            }
            "tools/call" => self.handle_tools_call(id, &params).await,
            other => error_response(id, METHOD_NOT_FOUND, &format!("method not found: {}", other)),
        };
        Some(response)
    }

    /// Handle one input line, returning the serialized response line if any.
    pub async fn handle_line(&self, line: &str) -> Option<String> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let response = match serde_json::from_str::<Value>(line) {
            Ok(request) => self.handle_request(request).await?,
            Err(err) => error_response(Value::Null, PARSE_ERROR, &format!("parse error: {}", err)),
        };
        Some(response.to_string())
    }

    /// Serve requests from stdin until it closes.
    pub async fn serve_stdio(self) -> std::io::Result<()> {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();

        let writer = tokio::spawn(async move {
            let mut stdout = tokio::io::stdout();
            while let Some(line) = rx.recv().await {
                stdout.write_all(line.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }
            Ok::<(), std::io::Error>(())
        });

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            let server = self.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                if let Some(response) = server.handle_line(&line).await {
                    if tx.send(response).is_err() {
                        log::warn!("McpServer::serve_stdio(): writer closed, dropping response");
                    }
                }
            });
        }

        log::info!("McpServer::serve_stdio(): stdin closed, shutting down");
        drop(tx);
        match writer.await {
            Ok(result) => result,
            Err(err) => Err(std::io::Error::new(std::io::ErrorKind::Other, err)),
        }
    }

    fn initialize_result(&self, params: &Value) -> Value {
        let protocol_version = params
            .get("protocolVersion")
            .and_then(Value::as_str)
            .unwrap_or(PROTOCOL_VERSION);
        json!({
            "protocolVersion": protocol_version,
            "capabilities": { "tools": { "listChanged": false } },
            "serverInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            }
        })
    }

    async fn handle_tools_call(&self, id: Value, params: &Value) -> Value {
        let name = match params.get("name").and_then(Value::as_str) {
            Some(name) => name,
            None => return error_response(id, INVALID_PARAMS, "tools/call requires a tool name"),
        };
        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

        match self.call_tool(name, &arguments).await {
            Ok(response) => {
                let mut result = response.to_value();
                result["isError"] = json!(false);
                success_response(id, result)
            }
            Err(BridgeError::UnknownTool(name)) => {
                error_response(id, INVALID_PARAMS, &format!("unknown tool: {}", name))
            }
            Err(err) => success_response(
                id,
                json!({
                    "content": [{ "type": "text", "text": err.to_string() }],
                    "isError": true,
                }),
            ),
        }
    }
}

fn success_response(id: Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn error_response(id: Value, code: i64, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message },
    })
}
