//! Anthropic Claude client wrapper speaking the native Messages API.
//!
//! Claude keeps system instructions out of the message list, so this client expects a
//! context assembled with [`MessageShape::SideChannel`](crate::llmbridge::context::MessageShape)
//! and sends `context.system` as the top-level `system` parameter. Any `system` entries that
//! still appear in the message list are folded into that parameter as well.
//!
//! # Example
//!
//! ```rust,no_run
//! use llmbridge::clients::claude::{ClaudeClient, Model};
//! use llmbridge::context::{assemble, MessageShape};
//! use llmbridge::ClientWrapper;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let key = std::env::var("ANTHROPIC_API_KEY")?;
//!     let client = ClaudeClient::new_with_model_enum(&key, Model::ClaudeSonnet4);
//!     let context = assemble(&[], "List three Claude capabilities.", "Be brief.", MessageShape::SideChannel);
//!     let reply = client.send_message(&context, client.default_model(), None).await?;
//!     println!("{}", reply.answer);
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Mutex;

use crate::llmbridge::client_wrapper::{ClientWrapper, ProviderResponse, Role, TokenUsage};
use crate::llmbridge::clients::common::{post_json, require_api_key, usage_field};
use crate::llmbridge::clients::http_pool::get_http_client;
use crate::llmbridge::config::DEFAULT_CLAUDE_MAX_TOKENS;
use crate::llmbridge::context::AssembledContext;
use crate::llmbridge::error::BridgeError;
use crate::llmbridge::provider::Provider;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Client wrapper for Anthropic's Messages API.
pub struct ClaudeClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    /// Exposed model name.
    model: String,
    max_tokens: u32,
    token_usage: Mutex<Option<TokenUsage>>,
}

/// Anthropic Claude models.
pub enum Model {
    /// `claude-opus-4-1` – most capable Opus tier.
    ClaudeOpus41,
    /// `claude-opus-4-0` – original Opus 4 generation.
    ClaudeOpus4,
    /// `claude-sonnet-4-0` – balanced reasoning + throughput.
    ClaudeSonnet4,
    /// `claude-3-7-sonnet-latest`
    ClaudeSonnet37,
    /// `claude-3-5-haiku-latest` – fastest Claude tier.
    ClaudeHaiku35,
}

/// Convert a [`Model`] variant into its public string identifier.
pub fn model_to_string(model: Model) -> String {
    match model {
        Model::ClaudeOpus41 => "claude-opus-4-1".to_string(),
        Model::ClaudeOpus4 => "claude-opus-4-0".to_string(),
        Model::ClaudeSonnet4 => "claude-sonnet-4-0".to_string(),
        Model::ClaudeSonnet37 => "claude-3-7-sonnet-latest".to_string(),
        Model::ClaudeHaiku35 => "claude-3-5-haiku-latest".to_string(),
    }
}

impl ClaudeClient {
    /// Create a client from an API key and strongly typed model variant.
    pub fn new_with_model_enum(secret_key: &str, model: Model) -> Self {
        Self::new_with_model_str(secret_key, &model_to_string(model))
    }

    /// Create a client from an API key and explicit model string.
    pub fn new_with_model_str(secret_key: &str, model_name: &str) -> Self {
        Self::new_with_base_url(secret_key, model_name, DEFAULT_BASE_URL)
    }

    /// Create a client pointing at a custom Claude-compatible base URL.
    pub fn new_with_base_url(secret_key: &str, model_name: &str, base_url: &str) -> Self {
        ClaudeClient {
            http: get_http_client(base_url),
            api_key: secret_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model_name.to_string(),
            max_tokens: DEFAULT_CLAUDE_MAX_TOKENS,
            token_usage: Mutex::new(None),
        }
    }

    /// Override the `max_tokens` budget sent with every request.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// The Messages API request body for `context`.
    pub fn build_request_body(
        context: &AssembledContext,
        model: &str,
        max_tokens: u32,
        tools: Option<&Value>,
    ) -> Value {
        let mut system_parts: Vec<&str> = Vec::new();
        if let Some(system) = &context.system {
            system_parts.push(system);
        }

        let mut messages = Vec::with_capacity(context.messages.len());
        for msg in &context.messages {
            if msg.role == Role::System.as_str() {
                system_parts.push(&msg.content);
                continue;
            }
            messages.push(json!({ "role": msg.role, "content": msg.content }));
        }

        let mut body = json!({
            "model": model,
            "max_tokens": max_tokens,
            "messages": messages,
        });
        if !system_parts.is_empty() {
            body["system"] = json!(system_parts.join("\n\n"));
        }
        if let Some(tools) = tools {
            body["tools"] = tools.clone();
        }
        body
    }

    /// Concatenation of every `text` content block.
    pub fn extract_text(raw: &Value) -> Option<String> {
        let blocks = raw.get("content")?.as_array()?;
        let text: Vec<&str> = blocks
            .iter()
            .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|b| b.get("text").and_then(Value::as_str))
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text.join("\n"))
        }
    }

    pub fn extract_usage(raw: &Value) -> Option<TokenUsage> {
        raw.get("usage")?;
        Some(TokenUsage::new(
            usage_field(raw, "/usage/input_tokens"),
            usage_field(raw, "/usage/output_tokens"),
        ))
    }
}

#[async_trait]
impl ClientWrapper for ClaudeClient {
    fn provider(&self) -> Provider {
        Provider::Claude
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    async fn send_message(
        &self,
        context: &AssembledContext,
        model: &str,
        tools: Option<&Value>,
    ) -> Result<ProviderResponse, BridgeError> {
        require_api_key(Provider::Claude, &self.api_key)?;

        let body = Self::build_request_body(context, model, self.max_tokens, tools);
        let url = format!("{}/messages", self.base_url);
        log::debug!("ClaudeClient::send_message(...): model {}", model);

        let request = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION);
        let raw = post_json(Provider::Claude, request, &body).await?;

        let usage = Self::extract_usage(&raw);
        if let Ok(mut slot) = self.token_usage.lock() {
            *slot = usage.clone();
        }

        Ok(ProviderResponse::new(Self::extract_text(&raw), raw, usage))
    }

    fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
        Some(&self.token_usage)
    }
}
