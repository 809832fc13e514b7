//! Configuration for llmbridge.
//!
//! Provides the [`BridgeConfig`] struct holding provider credentials, endpoints, default
//! models and global settings. Credentials are read from the environment once, at startup,
//! by [`BridgeConfig::from_env`]. A missing credential is not an error here: it surfaces as
//! an authentication failure the first time that provider is asked something.
//!
//! # Example
//!
//! ```rust
//! use llmbridge::BridgeConfig;
//! use llmbridge::Provider;
//! use std::time::Duration;
//!
//! let mut config = BridgeConfig::default();
//! config.request_timeout = Duration::from_secs(30);
//! config.provider_mut(Provider::OpenAI).api_key = "sk-test".to_string();
//!
//! assert_eq!(config.provider(Provider::OpenAI).api_key, "sk-test");
//! assert_eq!(config.max_turns, 20);
//! ```

use std::fmt;
use std::time::Duration;

use crate::llmbridge::clients::{claude, gemini, grok, openai};
use crate::llmbridge::provider::Provider;
use crate::llmbridge::session_store::DEFAULT_MAX_TURNS;

/// Environment variable overriding the request deadline, in seconds.
pub const TIMEOUT_ENV_VAR: &str = "LLMBRIDGE_TIMEOUT_SECS";
/// Environment variable overriding the behavioral preamble.
pub const SYSTEM_PROMPT_ENV_VAR: &str = "LLMBRIDGE_SYSTEM_PROMPT";

/// Preamble sent with every request unless overridden.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a knowledgeable assistant answering questions \
relayed by another AI agent on behalf of its user. Answer directly and concisely, state \
uncertainty plainly, and do not invent facts.";

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_CLAUDE_MAX_TOKENS: u32 = 4096;

/// Credential, endpoint and default model for one provider.
#[derive(Clone)]
pub struct ProviderSettings {
    /// API key; empty when the credential variable was not set.
    pub api_key: String,
    pub base_url: String,
    pub default_model: String,
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("api_key", &if self.api_key.is_empty() { "" } else { "[REDACTED]" })
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

impl ProviderSettings {
    /// Settings with the provider's public endpoint, default model and no credential.
    pub fn defaults_for(provider: Provider) -> Self {
        let (base_url, default_model) = match provider {
            Provider::OpenAI => (
                openai::DEFAULT_BASE_URL,
                openai::model_to_string(openai::Model::GPT41Mini),
            ),
            Provider::Claude => (
                claude::DEFAULT_BASE_URL,
                claude::model_to_string(claude::Model::ClaudeSonnet4),
            ),
            Provider::Gemini => (
                gemini::DEFAULT_BASE_URL,
                gemini::model_to_string(gemini::Model::Gemini20Flash),
            ),
            Provider::Grok => (
                grok::DEFAULT_BASE_URL,
                grok::model_to_string(grok::Model::Grok3MiniFastBeta),
            ),
        };
        ProviderSettings {
            api_key: String::new(),
            base_url: base_url.to_string(),
            default_model,
        }
    }
}

/// Global configuration for llmbridge.
///
/// Users may construct it by hand; no config-file parsing dependencies are introduced.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub openai: ProviderSettings,
    pub claude: ProviderSettings,
    pub gemini: ProviderSettings,
    pub grok: ProviderSettings,
    /// Behavioral preamble prepended (or side-channelled) on every request.
    pub system_prompt: String,
    /// Deadline for a single provider call.
    pub request_timeout: Duration,
    /// Turns retained per session.
    pub max_turns: usize,
    /// `max_tokens` sent to the Anthropic Messages API, which requires one.
    pub claude_max_tokens: u32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            openai: ProviderSettings::defaults_for(Provider::OpenAI),
            claude: ProviderSettings::defaults_for(Provider::Claude),
            gemini: ProviderSettings::defaults_for(Provider::Gemini),
            grok: ProviderSettings::defaults_for(Provider::Grok),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_turns: DEFAULT_MAX_TURNS,
            claude_max_tokens: DEFAULT_CLAUDE_MAX_TOKENS,
        }
    }
}

impl BridgeConfig {
    /// Read credentials and overrides from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = BridgeConfig::default();

        for provider in Provider::ALL {
            let var = provider.credential_env_var();
            match lookup(var) {
                Some(key) if !key.trim().is_empty() => {
                    config.provider_mut(provider).api_key = key.trim().to_string();
                }
                _ => log::warn!(
                    "BridgeConfig::from_env(): {} is not set; {} calls will fail authentication",
                    var,
                    provider
                ),
            }
        }

        if let Some(raw) = lookup(TIMEOUT_ENV_VAR) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.request_timeout = Duration::from_secs(secs),
                _ => log::warn!(
                    "BridgeConfig::from_env(): ignoring invalid {}={:?}",
                    TIMEOUT_ENV_VAR,
                    raw
                ),
            }
        }

        if let Some(prompt) = lookup(SYSTEM_PROMPT_ENV_VAR) {
            if !prompt.trim().is_empty() {
                config.system_prompt = prompt;
            }
        }

        config
    }

    pub fn provider(&self, provider: Provider) -> &ProviderSettings {
        match provider {
            Provider::OpenAI => &self.openai,
            Provider::Claude => &self.claude,
            Provider::Gemini => &self.gemini,
            Provider::Grok => &self.grok,
        }
    }

    pub fn provider_mut(&mut self, provider: Provider) -> &mut ProviderSettings {
        match provider {
            Provider::OpenAI => &mut self.openai,
            Provider::Claude => &mut self.claude,
            Provider::Gemini => &mut self.gemini,
            Provider::Grok => &mut self.grok,
        }
    }
}
