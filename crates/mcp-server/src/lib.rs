//! RLM MCP server library: configuration, metrics, storage, tokenizer
//! provider, and the tool surface. The `rlm-mcp` binary wires this onto a
//! stdio transport.

pub mod config;
pub mod metrics;
pub mod storage;
pub mod tokenizer;
pub mod tools;

pub use config::ServerConfig;
pub use tools::{RlmService, ServiceState};

/// Tool inventory payload for the `--print-tools` flag.
pub fn tools_inventory(version: &str) -> String {
    tools::catalog::tool_inventory_json(version)
}
