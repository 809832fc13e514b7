//! The `bridge` module ties the core together for one question:
//!
//! 1. resolve the session id,
//! 2. snapshot the session's history,
//! 3. assemble the provider-shaped context,
//! 4. call the provider under a deadline,
//! 5. normalize the response,
//! 6. record the exchange and build the result envelope.
//!
//! The provider call is the only suspension point. History is written only after a
//! successful response, in a single locked step, so failed or timed-out calls leave no trace.
//!
//! ## Quickstart
//!
//! ```rust,no_run
//! use llmbridge::{BridgeConfig, LLMBridge, Provider};
//! use llmbridge::tool_protocol::AskInput;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bridge = LLMBridge::new(&BridgeConfig::from_env());
//!
//!     let first = bridge.ask(Provider::Gemini, AskInput::new("Name a prime number.")).await?;
//!     let follow_up = AskInput::new("Name a bigger one.").with_session_id(first.session_id.clone());
//!     let second = bridge.ask(Provider::Gemini, follow_up).await?;
//!
//!     println!("{}", second.content[0].text);
//!     Ok(())
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::llmbridge::client_wrapper::{ClientWrapper, ProviderResponse};
use crate::llmbridge::clients::client_for;
use crate::llmbridge::config::BridgeConfig;
use crate::llmbridge::context::{assemble, AssembledContext};
use crate::llmbridge::error::BridgeError;
use crate::llmbridge::normalizer::normalize;
use crate::llmbridge::provider::Provider;
use crate::llmbridge::session_resolver;
use crate::llmbridge::session_store::SessionStore;
use crate::llmbridge::tool_protocol::{AskInput, ClearInput, ToolResponse};

/// Multiplexes questions across providers while keeping per-session history.
pub struct LLMBridge {
    clients: HashMap<Provider, Arc<dyn ClientWrapper>>,
    sessions: SessionStore,
    system_prompt: String,
    request_timeout: Duration,
}

impl LLMBridge {
    /// Build a bridge with one client per provider, configured from `config`.
    pub fn new(config: &BridgeConfig) -> Self {
        let clients = Provider::ALL
            .iter()
            .map(|&provider| (provider, client_for(provider, config)))
            .collect();
        LLMBridge {
            clients,
            sessions: SessionStore::with_max_turns(config.max_turns),
            system_prompt: config.system_prompt.clone(),
            request_timeout: config.request_timeout,
        }
    }

    /// Replace the client serving `client.provider()`.
    pub fn with_client(mut self, client: Arc<dyn ClientWrapper>) -> Self {
        self.clients.insert(client.provider(), client);
        self
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Default model of the client serving `provider`.
    pub fn default_model(&self, provider: Provider) -> Option<&str> {
        self.clients.get(&provider).map(|c| c.default_model())
    }

    /// Ask `provider` a question within the session named by `input.session_id`.
    pub async fn ask(&self, provider: Provider, input: AskInput) -> Result<ToolResponse, BridgeError> {
        let client = self
            .clients
            .get(&provider)
            .cloned()
            .ok_or_else(|| BridgeError::provider(provider, "no client configured"))?;

        let session_id = session_resolver::resolve(Some(&input.session_id));
        let history = self.sessions.snapshot(&session_id);
        let context = assemble(
            &history,
            &input.question,
            &self.system_prompt,
            provider.message_shape(),
        );
        let model = input
            .model
            .clone()
            .unwrap_or_else(|| client.default_model().to_string());

        log::info!(
            "LLMBridge::ask(...): {} model={} session={} history_turns={}",
            provider,
            model,
            session_id,
            history.len()
        );

        let response = self
            .dispatch(client.as_ref(), &context, &model, input.tools.as_ref())
            .await
            .map_err(|err| {
                log::error!("LLMBridge::ask(...): session {} failed: {}", session_id, err);
                err
            })?;

        if let Some(usage) = &response.usage {
            log::debug!(
                "LLMBridge::ask(...): {} usage input={} output={} total={}",
                provider,
                usage.input_tokens,
                usage.output_tokens,
                usage.total_tokens
            );
        }

        let normalized = normalize(response.answer, &response.raw);
        self.sessions
            .record_exchange(&session_id, &input.question, &normalized.answer);

        Ok(ToolResponse::answer(
            &normalized.answer,
            &session_id,
            normalized.tool_call,
        ))
    }

    /// Forget the session named in `input`. The id is used as given, never resolved.
    pub fn clear(&self, input: ClearInput) -> ToolResponse {
        self.sessions.clear(&input.session_id);
        log::info!("LLMBridge::clear(...): session {}", input.session_id);
        ToolResponse::cleared(&input.session_id)
    }

    /// Run the provider call under the configured deadline.
    async fn dispatch(
        &self,
        client: &dyn ClientWrapper,
        context: &AssembledContext,
        model: &str,
        tools: Option<&Value>,
    ) -> Result<ProviderResponse, BridgeError> {
        match tokio::time::timeout(
            self.request_timeout,
            client.send_message(context, model, tools),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(BridgeError::Timeout {
                provider: client.provider(),
                seconds: self.request_timeout.as_secs(),
            }),
        }
    }
}
