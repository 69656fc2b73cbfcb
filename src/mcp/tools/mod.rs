/// MCP Tools module - catalogue, argument validation and Jira handlers
///
/// Every tool call ends in one of two ways: a [`ToolResult`] envelope (success
/// or a recoverable failure with `isError` set), or a fatal [`MCPError`] that
/// the server turns into a JSON-RPC error.
pub mod invocation;
pub mod jira;
pub mod registry;

// Re-export core tool types
pub use self::invocation::ToolInvocation;
pub use self::registry::{ToolInfo, ToolName};

use serde::{Deserialize, Serialize};

use crate::jira::JiraApiError;
use crate::mcp::errors::MCPError;

/// Content types that tools can return
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Content {
    /// Plain text content
    #[serde(rename = "text")]
    Text { text: String },
}

/// The result envelope returned to the host for every tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub content: Vec<Content>,
    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl ToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text { text: text.into() }],
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text { text: text.into() }],
            is_error: true,
        }
    }

    /// All text blocks joined by newlines
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .map(|content| match content {
                Content::Text { text } => text.as_str(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Handler failures
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The Jira call failed; the agent gets to see why
    #[error("Jira API error: {0}")]
    Remote(#[from] JiraApiError),

    /// Jira answered 2xx but without a field the handler relies on
    #[error("Unexpected Jira response: {0}")]
    UnexpectedResponse(String),
}

impl ToolError {
    /// Split into a recovered envelope or a fatal protocol error
    pub fn into_outcome(self) -> Result<ToolResult, MCPError> {
        match self {
            ToolError::Remote(_) => Ok(ToolResult::error(self.to_string())),
            ToolError::UnexpectedResponse(_) => Err(MCPError::Internal(self.to_string())),
        }
    }
}
