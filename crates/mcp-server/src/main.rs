//! RLM MCP Server
//!
//! Context infrastructure for long-context reasoning agents, spoken over
//! MCP on stdio. The server performs no reasoning and issues no outbound
//! model calls; it stores, splits, searches, ranks, and evaluates.
//!
//! ## Usage
//!
//! Add to your MCP client configuration:
//! ```json
//! {
//!   "mcpServers": {
//!     "rlm": {
//!       "command": "rlm-mcp"
//!     }
//!   }
//! }
//! ```

use anyhow::Result;
use rlm_mcp::config::ServerConfig;
use rlm_mcp::RlmService;
use rmcp::ServiceExt;
use std::env;

fn print_help() {
    println!("RLM MCP server");
    println!();
    println!("Usage: rlm-mcp [--print-tools|--version|--help]");
    println!();
    println!("Flags:");
    println!("  --print-tools  Print tool inventory as JSON and exit");
    println!("  --version      Print version and exit");
    println!("  --help         Print this help and exit");
    println!();
    println!("Env:");
    println!("  RLM_MCP_LOG=1            Enable stderr logging (stdout stays protocol-pure)");
    println!("  RLM_STORAGE_DIR=<dir>    Enable file-backed context persistence");
    println!("  RLM_MAX_SESSIONS, RLM_SESSION_TTL_SECS, RLM_MAX_CONTEXT_BYTES, ...");
}

enum CliAction {
    Exit(i32),
}

fn handle_cli_args() -> Option<CliAction> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        return None;
    }

    match args[0].as_str() {
        "--stdio" | "stdio" => {
            // Compatibility: some MCP clients unconditionally pass `--stdio`.
            None
        }
        "--print-tools" => {
            println!(
                "{}",
                rlm_mcp::tools_inventory(env!("CARGO_PKG_VERSION"))
            );
            Some(CliAction::Exit(0))
        }
        "--version" | "-V" => {
            println!("rlm-mcp {}", env!("CARGO_PKG_VERSION"));
            Some(CliAction::Exit(0))
        }
        "--help" | "-h" => {
            print_help();
            Some(CliAction::Exit(0))
        }
        other => {
            // Be permissive: agent tooling can pass wrapper args. Starting
            // the server is better than failing the toolchain.
            if logging_enabled() {
                log::warn!("Ignoring unknown arguments starting at: {other}");
            }
            None
        }
    }
}

fn logging_enabled() -> bool {
    // Any non-MCP bytes on stdout break clients, and some clients merge
    // stderr into stdout. Silent unless explicitly enabled.
    std::env::var("RLM_MCP_LOG")
        .ok()
        .map(|v| {
            let v = v.trim();
            !(v.is_empty() || v == "0" || v.eq_ignore_ascii_case("false"))
        })
        .unwrap_or(false)
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Some(CliAction::Exit(code)) = handle_cli_args() {
        std::process::exit(code);
    }

    if logging_enabled() {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
            .target(env_logger::Target::Stderr)
            .init();
        log::info!("Starting RLM MCP server");
    }

    let config = ServerConfig::from_env();
    let scavenge_interval = config.scavenge_interval;
    let service = RlmService::new(config)?;

    // Background scavenger: evict idle sessions on a fixed cadence.
    let registry = service.state().registry.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(scavenge_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let evicted = registry.scavenge();
            if !evicted.is_empty() {
                log::info!("scavenger evicted {} idle session(s)", evicted.len());
            }
        }
    });

    let server = service.serve(rmcp::transport::stdio()).await?;
    server.waiting().await?;

    if logging_enabled() {
        log::info!("RLM MCP server stopped");
    }
    Ok(())
}
