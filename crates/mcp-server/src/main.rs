//! gdbridge MCP tool proxy
//!
//! Exposes a running gdbridge bridge (and the project's quality gates) to an agent over MCP.
//!
//! ## Usage
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "godot": {
//!       "command": "gdbridge-mcp",
//!       "env": { "GODOT_PROJECT_ROOT": "/path/to/game" }
//!     }
//!   }
//! }
//! ```

use anyhow::Result;
use gdbridge_mcp::{GodotProxyService, ProxyConfig};
use rmcp::transport::stdio;
use rmcp::ServiceExt;

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the protocol
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = ProxyConfig::from_env();
    log::info!(
        "Starting gdbridge MCP proxy for {} (bridge {})",
        config.project_root.display(),
        config.bridge_url
    );

    let service = GodotProxyService::new(config);
    let server = service.serve(stdio()).await?;
    server.waiting().await?;

    log::info!("gdbridge MCP proxy stopped");
    Ok(())
}
