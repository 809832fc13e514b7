// src/llmbridge/mod.rs

pub mod bridge;
pub mod client_wrapper;
pub mod clients;
pub mod config;
pub mod context;
pub mod error;
pub mod mcp_server;
pub mod normalizer;
pub mod provider;
pub mod session_resolver;
pub mod session_store;
pub mod tool_protocol;

// Let's explicitly export LLMBridge so we don't have to access it via llmbridge::bridge::LLMBridge
// and instead as llmbridge::LLMBridge
pub use bridge::LLMBridge;
