use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error handling for the MCP bridge
pub type MCPResult<T> = Result<T, MCPError>;

/// Failures that abort a request at the protocol level.
///
/// Anything the agent can reason about (remote API errors, unknown transition
/// names) is returned inside a tool result instead and never reaches this type.
#[derive(Debug, thiserror::Error)]
pub enum MCPError {
    #[error("{0}")]
    Configuration(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments: {0}")]
    InvalidParams(String),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Transport layer errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transport closed")]
    Closed,
}

/// Protocol-level errors
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Well-formed JSON that is not a valid JSON-RPC message. Carries the
    /// message id when one could be read so the reply can be correlated.
    #[error("Invalid JSON-RPC message: {reason}")]
    InvalidMessage { id: Option<Value>, reason: String },

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl ProtocolError {
    /// Id to answer a rejected message with, `null` when none was readable
    pub fn request_id(&self) -> Value {
        match self {
            Self::InvalidMessage { id: Some(id), .. } => id.clone(),
            _ => Value::Null,
        }
    }
}

/// JSON-RPC 2.0 error codes
#[derive(Debug, Clone, Copy)]
pub enum JsonRpcErrorCode {
    ParseError = -32700,
    InvalidRequest = -32600,
    MethodNotFound = -32601,
    InvalidParams = -32602,
    InternalError = -32603,
}

/// JSON-RPC error response structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: JsonRpcErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code as i32,
            message: message.into(),
            data: None,
        }
    }
}

impl From<MCPError> for JsonRpcError {
    fn from(error: MCPError) -> Self {
        let message = error.to_string();
        match error {
            MCPError::UnknownTool(_) | MCPError::Protocol(ProtocolError::MethodNotFound(_)) => {
                JsonRpcError::new(JsonRpcErrorCode::MethodNotFound, message)
            }
            MCPError::InvalidParams(_) => JsonRpcError::new(JsonRpcErrorCode::InvalidParams, message),
            MCPError::Protocol(ProtocolError::ParseError(_)) => {
                JsonRpcError::new(JsonRpcErrorCode::ParseError, message)
            }
            MCPError::Protocol(ProtocolError::InvalidMessage { .. }) => {
                JsonRpcError::new(JsonRpcErrorCode::InvalidRequest, message)
            }
            _ => JsonRpcError::new(JsonRpcErrorCode::InternalError, message),
        }
    }
}

impl From<ProtocolError> for JsonRpcError {
    fn from(error: ProtocolError) -> Self {
        MCPError::Protocol(error).into()
    }
}
