//! Error types for the MCP server.
//!
//! `McpError` covers protocol and argument failures. Failures reported by the
//! Docstore API live in [`crate::client::ApiError`] and never surface here:
//! tool handlers turn them into structured tool responses.

use serde::{Deserialize, Serialize};

/// MCP server errors.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
pub enum McpError {
    /// Unknown tool requested.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Missing required argument.
    #[error("missing required argument: {0}")]
    MissingArg(String),

    /// Invalid argument value.
    #[error("invalid argument '{name}': {reason}")]
    InvalidArg {
        /// Argument name
        name: String,
        /// Reason why it's invalid
        reason: String,
    },

    /// JSON-RPC protocol error.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The protocol session was already closed.
    #[error("session closed")]
    SessionClosed,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl McpError {
    /// Shorthand for [`McpError::InvalidArg`].
    pub fn invalid_arg(name: impl Into<String>, reason: impl Into<String>) -> Self {
        McpError::InvalidArg {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error describes a problem with the caller's tool arguments.
    pub fn is_argument_error(&self) -> bool {
        matches!(self, McpError::MissingArg(_) | McpError::InvalidArg { .. })
    }
}

impl From<std::io::Error> for McpError {
    fn from(err: std::io::Error) -> Self {
        McpError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for McpError {
    fn from(err: serde_json::Error) -> Self {
        McpError::Protocol(format!("JSON error: {}", err))
    }
}

/// JSON-RPC error codes.
pub mod rpc_codes {
    /// Parse error - Invalid JSON was received.
    pub const PARSE_ERROR: i32 = -32700;
    /// Invalid Request - The JSON sent is not a valid Request object.
    pub const INVALID_REQUEST: i32 = -32600;
    /// Method not found - The method does not exist / is not available.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid params - Invalid method parameter(s).
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal error - Internal JSON-RPC error.
    pub const INTERNAL_ERROR: i32 = -32603;
}

impl McpError {
    /// Convert to JSON-RPC error code.
    pub fn rpc_code(&self) -> i32 {
        match self {
            McpError::UnknownTool(_) => rpc_codes::METHOD_NOT_FOUND,
            McpError::MissingArg(_) | McpError::InvalidArg { .. } => rpc_codes::INVALID_PARAMS,
            McpError::Protocol(_) => rpc_codes::INVALID_REQUEST,
            _ => rpc_codes::INTERNAL_ERROR,
        }
    }
}

/// Result type for MCP operations.
pub type Result<T> = std::result::Result<T, McpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_codes() {
        assert_eq!(
            McpError::UnknownTool("x".into()).rpc_code(),
            rpc_codes::METHOD_NOT_FOUND
        );
        assert_eq!(
            McpError::invalid_arg("limit", "too big").rpc_code(),
            rpc_codes::INVALID_PARAMS
        );
        assert_eq!(McpError::SessionClosed.rpc_code(), rpc_codes::INTERNAL_ERROR);
    }

    #[test]
    fn test_argument_errors() {
        assert!(McpError::MissingArg("id".into()).is_argument_error());
        assert!(!McpError::Protocol("bad".into()).is_argument_error());
    }
}
