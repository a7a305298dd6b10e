//! LSP server command implementation.

use anyhow::Result;
use lobster_lsp::ServerConfig;

/// Execute the LSP server.
///
/// This starts the Lobster language server, communicating over stdio with
/// JSON-RPC messages.
pub fn execute(config: ServerConfig) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(lobster_lsp::run_server(config))
}
