//! # llmbridge
//!
//! llmbridge exposes several hosted Large Language Model providers as uniform MCP tools and
//! keeps a short, bounded conversation history per session so a client can hold multi-turn
//! conversations with any of them.
//!
//! The crate provides layered abstractions for:
//!
//! * **Sessions**: [`SessionStore`](session_store::SessionStore) keeps the most recent 20
//!   turns per session id, and [`session_resolver`] decides whether a request starts a new
//!   conversation or resumes one
//! * **Context assembly**: [`context`] lays history out the way each provider expects
//!   (inline system role, side-channel system parameter, or relabeled assistant turns)
//! * **Provider Flexibility**: [`ClientWrapper`] implemented for OpenAI, Anthropic Claude,
//!   Google Gemini and xAI Grok, each returning the provider's raw JSON
//! * **Normalization**: [`normalizer`] turns six divergent tool-call shapes into one
//!   [`ToolCall`](normalizer::ToolCall)
//! * **Serving**: [`mcp_server::McpServer`] speaks MCP over stdio and routes `ask_*` and
//!   `clear_session` calls to an [`LLMBridge`]
//!
//! ## Core Concepts
//!
//! ### LLMBridge: one question, end to end
//!
//! ```rust,no_run
//! use llmbridge::tool_protocol::AskInput;
//! use llmbridge::{BridgeConfig, LLMBridge, Provider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     llmbridge::init_logger();
//!     let bridge = LLMBridge::new(&BridgeConfig::from_env());
//!
//!     let reply = bridge
//!         .ask(Provider::Claude, AskInput::new("What is the capital of France?"))
//!         .await?;
//!
//!     println!("{}", reply.content[0].text);
//!     println!("continue with session_id = {}", reply.session_id);
//!     Ok(())
//! }
//! ```
//!
//! ### Normalizing tool calls
//!
//! ```rust
//! use llmbridge::normalizer::{extract, ToolCallSource};
//! use serde_json::json;
//!
//! let raw = json!({
//!     "choices": [{
//!         "message": {
//!             "tool_calls": [{
//!                 "id": "call_1",
//!                 "type": "function",
//!                 "function": {"name": "get_weather", "arguments": "{\"city\":\"Lima\"}"}
//!             }]
//!         }
//!     }]
//! });
//!
//! let call = extract(&raw).expect("tool call");
//! assert_eq!(call.source, ToolCallSource::ToolCalls);
//! assert_eq!(call.args, Some(json!({"city": "Lima"})));
//! ```

use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Initialise the global [`env_logger`] subscriber exactly once.
///
/// `env_logger` writes to stderr, which keeps stdout free for MCP protocol traffic.
///
/// ```rust
/// llmbridge::init_logger();
/// log::info!("Logger is ready");
/// ```
pub fn init_logger() {
    INIT_LOGGER.call_once(|| {
        env_logger::init();
    });
}

// Import the top-level `llmbridge` module.
pub mod llmbridge;

// Re-exporting key items for easier external access.
pub use llmbridge::bridge;
pub use llmbridge::client_wrapper;
pub use llmbridge::client_wrapper::{ClientWrapper, ProviderResponse, Role, TokenUsage, Turn};
pub use llmbridge::clients;
pub use llmbridge::config;
pub use llmbridge::config::BridgeConfig;
pub use llmbridge::context;
pub use llmbridge::error::BridgeError;
pub use llmbridge::mcp_server;
pub use llmbridge::normalizer;
pub use llmbridge::provider::Provider;
pub use llmbridge::session_resolver;
pub use llmbridge::session_store;
pub use llmbridge::tool_protocol;
pub use llmbridge::LLMBridge;
