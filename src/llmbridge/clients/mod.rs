//! Provider specific [`ClientWrapper`](crate::llmbridge::client_wrapper::ClientWrapper) implementations.
//!
//! Each submodule offers a concrete client that speaks a particular vendor's API while
//! conforming to the uniform llmbridge contract: take an assembled context, return the
//! vendor's raw JSON plus its answer text.

pub mod common;
pub mod http_pool;

pub mod claude;
pub mod gemini;
pub mod grok;
pub mod openai;

use std::sync::Arc;

use crate::llmbridge::client_wrapper::ClientWrapper;
use crate::llmbridge::config::BridgeConfig;
use crate::llmbridge::provider::Provider;

/// Build the client for `provider` from `config`.
pub fn client_for(provider: Provider, config: &BridgeConfig) -> Arc<dyn ClientWrapper> {
    let settings = config.provider(provider);
    let (key, model, url) = (
        settings.api_key.as_str(),
        settings.default_model.as_str(),
        settings.base_url.as_str(),
    );
    match provider {
        Provider::OpenAI => Arc::new(openai::OpenAIClient::new_with_base_url(key, model, url)),
        Provider::Claude => Arc::new(
            claude::ClaudeClient::new_with_base_url(key, model, url)
                .with_max_tokens(config.claude_max_tokens),
        ),
        Provider::Gemini => Arc::new(gemini::GeminiClient::new_with_base_url(key, model, url)),
        Provider::Grok => Arc::new(grok::GrokClient::new_with_base_url(key, model, url)),
    }
}
