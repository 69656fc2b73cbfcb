/// Model Context Protocol (MCP) implementation for the Jira bridge
///
/// This module provides the stdio MCP server an agent host launches to reach
/// Jira: JSON-RPC framing, the tool catalogue, argument validation and the
/// dispatch of tool calls to the Jira adapter.
pub mod context;
pub mod errors;
pub mod protocol;
pub mod server;
pub mod tools;
pub mod transport;

// Re-export core types for easier access
pub use self::{
    context::ServerContext,
    server::MCPServer,
    transport::{MCPTransport, StdioTransport},
};

/// Server information
pub const SERVER_NAME: &str = "jira-mcp-bridge";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
