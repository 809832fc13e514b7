//! A ClientWrapper is a wrapper around a specific cloud LLM service.
//! It provides a common interface for sending an assembled conversation to the service.
//! It does not keep track of the conversation/session, for that we use the
//! [`SessionStore`](crate::llmbridge::session_store::SessionStore), and the
//! [`LLMBridge`](crate::llmbridge::bridge::LLMBridge) stitches the two together.
// src/llmbridge/client_wrapper.rs

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use crate::llmbridge::context::AssembledContext;
use crate::llmbridge::error::BridgeError;
use crate::llmbridge::provider::Provider;

/// Answer text used when a provider response carries no usable text.
pub const NO_TEXT_PLACEHOLDER: &str = "(no text content returned by the model)";

/// Represents the possible roles for a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    // set by the bridge to steer the model's responses, never stored in a session
    System,
    // the question relayed by the MCP client
    User,
    // text the model produced in reply
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One role-tagged message of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Turn {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Turn::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Turn::new(Role::Assistant, content)
    }
}

/// How many tokens were spent on prompt vs. completion.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub total_tokens: usize,
}

impl TokenUsage {
    pub fn new(input_tokens: usize, output_tokens: usize) -> Self {
        TokenUsage {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
        }
    }
}

/// What a provider call hands back to the bridge.
#[derive(Clone, Debug)]
pub struct ProviderResponse {
    /// The answer text, or [`NO_TEXT_PLACEHOLDER`] when the provider returned none.
    pub answer: String,
    /// The provider's native JSON response, unmodified.
    pub raw: serde_json::Value,
    pub usage: Option<TokenUsage>,
}

impl ProviderResponse {
    /// Wrap a raw response, substituting the placeholder for missing or blank text.
    pub fn new(text: Option<String>, raw: serde_json::Value, usage: Option<TokenUsage>) -> Self {
        let answer = match text {
            Some(text) if !text.trim().is_empty() => text,
            _ => NO_TEXT_PLACEHOLDER.to_string(),
        };
        ProviderResponse { answer, raw, usage }
    }
}

/// Trait defining the interface to interact with the various LLM services.
#[async_trait]
pub trait ClientWrapper: Send + Sync {
    /// The provider family this client talks to.
    fn provider(&self) -> Provider;

    /// Model used when the caller does not name one.
    fn default_model(&self) -> &str;

    /// Send an assembled conversation to the LLM and return its raw response.
    /// - `context`: messages (and side-channel system text) already shaped for this provider.
    /// - `model`: the model identifier to request.
    /// - `tools`: optional tool definitions, forwarded verbatim.
    async fn send_message(
        &self,
        context: &AssembledContext,
        model: &str,
        tools: Option<&serde_json::Value>,
    ) -> Result<ProviderResponse, BridgeError>;

    /// Hook to retrieve usage from the *last* send_message() call.
    /// Default impl returns None so wrappers without usage tracking don't break.
    fn get_last_usage(&self) -> Option<TokenUsage> {
        self.usage_slot()
            .and_then(|slot| slot.lock().ok().and_then(|u| u.clone()))
    }

    fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
        // ClientWrapper implementations supporting TokenUsage tracking should return their slot by overriding this method.
        None
    }
}
