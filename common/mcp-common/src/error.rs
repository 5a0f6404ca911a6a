//! Error helpers for MCP servers
//!
//! Protocol-level failures are carried as [`McpError`] (rmcp's JSON-RPC error
//! object), which serializes directly into the `error` member of a response.

use rmcp::model::ErrorCode;
use rmcp::ErrorData as McpError;

/// Type alias for results that fail with a protocol-level error
pub type McpResult<T> = Result<T, McpError>;

/// Create an internal error (`-32603`) with a message
///
/// Used for anything that goes wrong at the dispatch boundary: bad
/// arguments, serialization failures, panicking handlers.
///
/// # Example
///
/// ```rust,ignore
/// use mcp_common::internal_error;
///
/// return Err(internal_error("Something went wrong"));
/// ```
pub fn internal_error(message: impl Into<String>) -> McpError {
    McpError::internal_error(message.into(), None)
}

/// Create a method-not-found error (`-32601`) with a message
///
/// Covers both unknown JSON-RPC methods and unknown tool names.
pub fn method_not_found(message: impl Into<String>) -> McpError {
    McpError::new(ErrorCode::METHOD_NOT_FOUND, message.into(), None)
}
