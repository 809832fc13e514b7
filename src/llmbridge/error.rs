//! Error taxonomy shared by the tool surface, the bridge and the provider clients.
//!
//! Every failure that reaches an MCP caller is one of these variants. Provider failures
//! always carry the provider's display name so the caller can tell which backend failed
//! without inspecting logs.

use std::error::Error;
use std::fmt;

use crate::llmbridge::provider::Provider;

/// Errors surfaced by llmbridge.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeError {
    /// Malformed or missing tool arguments. Raised before any provider call.
    InvalidInput(String),
    /// The provider credential is missing or was rejected.
    Authentication {
        provider: Provider,
        /// Name of the environment variable the credential is read from.
        env_var: &'static str,
        message: String,
    },
    /// The provider answered with HTTP 429.
    RateLimited { provider: Provider, message: String },
    /// The call did not finish before the configured deadline.
    Timeout { provider: Provider, seconds: u64 },
    /// Any other provider or transport failure.
    Provider { provider: Provider, message: String },
    /// `tools/call` named a tool that is not registered.
    UnknownTool(String),
}

impl BridgeError {
    /// Build an [`BridgeError::Authentication`] for `provider`, filling in its env var.
    pub fn authentication(provider: Provider, message: impl Into<String>) -> Self {
        BridgeError::Authentication {
            provider,
            env_var: provider.credential_env_var(),
            message: message.into(),
        }
    }

    pub fn rate_limited(provider: Provider, message: impl Into<String>) -> Self {
        BridgeError::RateLimited {
            provider,
            message: message.into(),
        }
    }

    pub fn provider(provider: Provider, message: impl Into<String>) -> Self {
        BridgeError::Provider {
            provider,
            message: message.into(),
        }
    }

    /// The provider this error is attributed to, if any.
    pub fn provider_kind(&self) -> Option<Provider> {
        match self {
            BridgeError::Authentication { provider, .. }
            | BridgeError::RateLimited { provider, .. }
            | BridgeError::Timeout { provider, .. }
            | BridgeError::Provider { provider, .. } => Some(*provider),
            BridgeError::InvalidInput(_) | BridgeError::UnknownTool(_) => None,
        }
    }

    /// True for failures a caller may reasonably back off and retry.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, BridgeError::RateLimited { .. })
    }
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            BridgeError::Authentication {
                provider,
                env_var,
                message,
            } => write!(
                f,
                "{} authentication failed: {}. Set the {} environment variable to a valid API key.",
                provider, message, env_var
            ),
            BridgeError::RateLimited { provider, message } => write!(
                f,
                "{} rate limit exceeded: {}. Wait before retrying.",
                provider, message
            ),
            BridgeError::Timeout { provider, seconds } => {
                write!(f, "{} request timed out after {}s", provider, seconds)
            }
            BridgeError::Provider { provider, message } => {
                write!(f, "{} API error: {}", provider, message)
            }
            BridgeError::UnknownTool(name) => write!(f, "Unknown tool: {}", name),
        }
    }
}

impl Error for BridgeError {}
