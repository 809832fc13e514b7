//! `llmbridge` binary: serves the bridge's tools to an MCP client over stdio.
//!
//! Credentials are read once at startup from `OPENAI_API_KEY`, `ANTHROPIC_API_KEY`,
//! `GEMINI_API_KEY` and `XAI_API_KEY`. Logs go to stderr; set `RUST_LOG=debug` for detail.

use std::sync::Arc;

use llmbridge::mcp_server::McpServer;
use llmbridge::{BridgeConfig, LLMBridge};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    llmbridge::init_logger();

    let config = BridgeConfig::from_env();
    log::info!(
        "llmbridge {} starting (timeout {}s, {} turns per session)",
        env!("CARGO_PKG_VERSION"),
        config.request_timeout.as_secs(),
        config.max_turns
    );

    let server = McpServer::new(Arc::new(LLMBridge::new(&config)));
    server.serve_stdio().await?;
    Ok(())
}
