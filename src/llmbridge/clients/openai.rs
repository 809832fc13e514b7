//! The `OpenAIClient` struct implements `ClientWrapper` for OpenAI's Chat Completions API,
//! returning the native JSON response untouched so tool calls can be normalized downstream,
//! and capturing token usage for diagnostics.
//!
//! The same wire format is spoken by several OpenAI compatible services; the
//! [`GrokClient`](crate::llmbridge::clients::grok::GrokClient) reuses this client with a
//! different base URL.
//!
//! # Example
//!
//! ```rust,no_run
//! use llmbridge::clients::openai::{Model, OpenAIClient};
//! use llmbridge::context::{assemble, MessageShape};
//! use llmbridge::ClientWrapper;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = OpenAIClient::new_with_model_enum(&std::env::var("OPENAI_API_KEY")?, Model::GPT41Nano);
//!     let context = assemble(&[], "Hello!", "You are terse.", MessageShape::RoleAnnotated);
//!     let reply = client.send_message(&context, client.default_model(), None).await?;
//!     println!("Assistant: {}", reply.answer);
//!     if let Some(usage) = client.get_last_usage() {
//!         println!("Tokens used: {}", usage.total_tokens);
//!     }
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Mutex;

use crate::llmbridge::client_wrapper::{ClientWrapper, ProviderResponse, Role, TokenUsage};
use crate::llmbridge::clients::common::{post_json, require_api_key, usage_field};
use crate::llmbridge::clients::http_pool::get_http_client;
use crate::llmbridge::context::AssembledContext;
use crate::llmbridge::error::BridgeError;
use crate::llmbridge::provider::Provider;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Model identifiers supported by OpenAI's Chat Completions API.
pub enum Model {
    /// `gpt-5` – high reasoning, medium latency.
    GPT5,
    /// `gpt-5-mini` – fast variant of GPT-5.
    GPT5Mini,
    /// `gpt-4o` – Omni model with text + image inputs.
    GPT4o,
    /// `gpt-4o-mini` – cost effective GPT-4o derivative.
    GPT4oMini,
    /// `o3` – O-series reasoning model.
    O3,
    /// `o4-mini` – low-latency O-series tier.
    O4Mini,
    GPT41,
    GPT41Mini,
    GPT41Nano,
}

/// Convert a [`Model`] variant into the string identifier expected by the REST API.
pub fn model_to_string(model: Model) -> String {
    match model {
        Model::GPT5 => "gpt-5".to_string(),
        Model::GPT5Mini => "gpt-5-mini".to_string(),
        Model::GPT4o => "gpt-4o".to_string(),
        Model::GPT4oMini => "gpt-4o-mini".to_string(),
        Model::O3 => "o3".to_string(),
        Model::O4Mini => "o4-mini".to_string(),
        Model::GPT41 => "gpt-4.1".to_string(),
        Model::GPT41Mini => "gpt-4.1-mini".to_string(),
        Model::GPT41Nano => "gpt-4.1-nano".to_string(),
    }
}

/// Client wrapper for OpenAI's Chat Completions API (and compatible endpoints).
pub struct OpenAIClient {
    /// Provider the requests are attributed to in errors and logs.
    provider: Provider,
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    /// Model used when the caller does not pick one.
    model: String,
    /// Storage for the token usage returned by the most recent request.
    token_usage: Mutex<Option<TokenUsage>>,
}

impl OpenAIClient {
    /// Construct a new client using the provided API key and [`Model`] variant.
    pub fn new_with_model_enum(secret_key: &str, model: Model) -> Self {
        Self::new_with_model_string(secret_key, &model_to_string(model))
    }

    /// Construct a new client using the provided API key and explicit model name.
    pub fn new_with_model_string(secret_key: &str, model_name: &str) -> Self {
        Self::new_with_base_url(secret_key, model_name, DEFAULT_BASE_URL)
    }

    /// Construct a client targeting a custom OpenAI compatible base URL.
    pub fn new_with_base_url(secret_key: &str, model_name: &str, base_url: &str) -> Self {
        Self::for_provider(Provider::OpenAI, secret_key, model_name, base_url)
    }

    /// Construct a client that speaks the OpenAI wire format on behalf of `provider`.
    pub(crate) fn for_provider(
        provider: Provider,
        secret_key: &str,
        model_name: &str,
        base_url: &str,
    ) -> Self {
        OpenAIClient {
            provider,
            http: get_http_client(base_url),
            api_key: secret_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model_name.to_string(),
            token_usage: Mutex::new(None),
        }
    }

    /// The chat-completions request body for `context`.
    pub fn build_request_body(
        context: &AssembledContext,
        model: &str,
        tools: Option<&Value>,
    ) -> Value {
        let mut messages = Vec::with_capacity(context.messages.len() + 1);
        if let Some(system) = &context.system {
            messages.push(json!({ "role": Role::System.as_str(), "content": system }));
        }
        for msg in &context.messages {
            messages.push(json!({ "role": msg.role, "content": msg.content }));
        }

        let mut body = json!({
            "model": model,
            "messages": messages,
        });
        if let Some(tools) = tools {
            body["tools"] = tools.clone();
        }
        body
    }

    /// The assistant text of the first choice, if any.
    pub fn extract_text(raw: &Value) -> Option<String> {
        raw.pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    /// Token usage reported under `usage`, if present.
    pub fn extract_usage(raw: &Value) -> Option<TokenUsage> {
        raw.get("usage")?;
        Some(TokenUsage {
            input_tokens: usage_field(raw, "/usage/prompt_tokens"),
            output_tokens: usage_field(raw, "/usage/completion_tokens"),
            total_tokens: usage_field(raw, "/usage/total_tokens"),
        })
    }
}

#[async_trait]
impl ClientWrapper for OpenAIClient {
    fn provider(&self) -> Provider {
        self.provider
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
        require_api_key(self.provider, &self.api_key)?;

        let body = Self::build_request_body(context, model, tools);
        let url = format!("{}/chat/completions", self.base_url);
        log::debug!(
            "OpenAIClient::send_message(...): {} request to {} with model {}",
            self.provider,
            url,
            model
        );

        let request = self.http.post(&url).bearer_auth(&self.api_key);
        let raw = post_json(self.provider, request, &body).await?;

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llmbridge::context::{assemble, MessageShape};

    #[test]
    fn body_carries_tools_verbatim() {
        let context = assemble(&[], "hi", "be nice", MessageShape::RoleAnnotated);
        let tools = json!([{"type": "function", "function": {"name": "lookup"}}]);
        let body = OpenAIClient::build_request_body(&context, "gpt-4.1-mini", Some(&tools));

        assert_eq!(body["model"], "gpt-4.1-mini");
        assert_eq!(body["tools"], tools);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
    }

    #[test]
    fn body_omits_tools_when_absent() {
        let context = assemble(&[], "hi", "p", MessageShape::RoleAnnotated);
        let body = OpenAIClient::build_request_body(&context, "gpt-4o", None);
        assert!(body.get("tools").is_none());
    }
}
