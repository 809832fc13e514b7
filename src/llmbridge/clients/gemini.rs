use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Mutex;

use crate::llmbridge::client_wrapper::{ClientWrapper, ProviderResponse, Role, TokenUsage};
use crate::llmbridge::clients::common::{post_json, require_api_key, usage_field};
use crate::llmbridge::clients::http_pool::get_http_client;
use crate::llmbridge::context::AssembledContext;
use crate::llmbridge::error::BridgeError;
use crate::llmbridge::provider::Provider;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Client for Google's `generateContent` endpoint.
///
/// Expects contexts assembled with role relabeling (`assistant` already sent as `model`).
/// Gemini has no `system` role inside `contents`, so leading `system` entries are lifted into
/// `systemInstruction`.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    pub model: String,
    token_usage: Mutex<Option<TokenUsage>>,
}

// Text generation models as of mid 2025
pub enum Model {
    Gemini20Flash,
    Gemini20FlashLite,
    Gemini15Pro,
    Gemini15Flash,
    Gemini25Flash,
    Gemini25Pro,
    Gemini25FlashLite,
}

pub fn model_to_string(model: Model) -> String {
    match model {
        Model::Gemini20Flash => "gemini-2.0-flash".to_string(),
        Model::Gemini20FlashLite => "gemini-2.0-flash-lite".to_string(),
        Model::Gemini15Pro => "gemini-1.5-pro".to_string(),
        Model::Gemini15Flash => "gemini-1.5-flash".to_string(),
        Model::Gemini25Flash => "gemini-2.5-flash".to_string(),
        Model::Gemini25Pro => "gemini-2.5-pro".to_string(),
        Model::Gemini25FlashLite => "gemini-2.5-flash-lite".to_string(),
    }
}

impl GeminiClient {
    pub fn new_with_model_string(secret_key: &str, model_name: &str) -> Self {
        Self::new_with_base_url(secret_key, model_name, DEFAULT_BASE_URL)
    }

    pub fn new_with_model_enum(secret_key: &str, model: Model) -> Self {
        Self::new_with_model_string(secret_key, &model_to_string(model))
    }

    /// This function is used to create a GeminiClient with a custom base URL
    /// The default base URL is "<https://generativelanguage.googleapis.com/v1beta>"
    pub fn new_with_base_url(secret_key: &str, model_name: &str, base_url: &str) -> Self {
        GeminiClient {
            http: get_http_client(base_url),
            api_key: secret_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model_name.to_string(),
            token_usage: Mutex::new(None),
        }
    }

    fn api_url(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    /// The `generateContent` request body for `context`.
    pub fn build_request_body(context: &AssembledContext, tools: Option<&Value>) -> Value {
        let mut system_parts: Vec<Value> = Vec::new();
        if let Some(system) = &context.system {
            system_parts.push(json!({ "text": system }));
        }

        let mut contents = Vec::with_capacity(context.messages.len());
        for msg in &context.messages {
            if msg.role == Role::System.as_str() {
                system_parts.push(json!({ "text": msg.content }));
                continue;
            }
            contents.push(json!({
                "role": msg.role,
                "parts": [{ "text": msg.content }]
            }));
        }

        let mut body = json!({ "contents": contents });
        if !system_parts.is_empty() {
            body["systemInstruction"] = json!({ "parts": system_parts });
        }
        if let Some(tools) = tools {
            body["tools"] = tools.clone();
        }
        body
    }

    /// Concatenated text parts of the first candidate.
    pub fn extract_text(raw: &Value) -> Option<String> {
        let parts = raw.pointer("/candidates/0/content/parts")?.as_array()?;
        let text: String = parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    pub fn extract_usage(raw: &Value) -> Option<TokenUsage> {
        raw.get("usageMetadata")?;
        Some(TokenUsage::new(
            usage_field(raw, "/usageMetadata/promptTokenCount"),
            usage_field(raw, "/usageMetadata/candidatesTokenCount"),
        ))
    }
}

#[async_trait]
impl ClientWrapper for GeminiClient {
    fn provider(&self) -> Provider {
        Provider::Gemini
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
        require_api_key(Provider::Gemini, &self.api_key)?;

        let body = Self::build_request_body(context, tools);
        let url = self.api_url(model);
        log::debug!("GeminiClient::send_message(...): model {}", model);

        let request = self.http.post(&url).header("x-goog-api-key", &self.api_key);
        let raw = post_json(Provider::Gemini, request, &body).await?;

        let usage = Self::extract_usage(&raw);
        if let Ok(mut slot) = self.token_usage.lock() {
            *slot = usage.clone();
        }

        Ok(ProviderResponse::new(Self::extract_text(&raw), raw, usage))
    }

    /// Token usage for the last request; `None` before the first successful call.
    fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
        Some(&self.token_usage)
    }
}
