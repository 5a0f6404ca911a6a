//! Embeddable MCP trait
//!
//! [`EmbeddableMcp`] is the seam between protocol handling and a concrete
//! server. The [`Dispatcher`](crate::Dispatcher) only talks to this trait, and
//! the same trait lets a host call tools directly in-process.
//!
//! # Example
//!
//! ```rust,ignore
//! use mcp_common::EmbeddableMcp;
//!
//! let tools = server.list_tools();
//! println!("Available: {:?}", tools.iter().map(|t| &t.name).collect::<Vec<_>>());
//!
//! let result = server
//!     .call_tool("list_directory", serde_json::json!({"path": "."}))
//!     .await?;
//! ```

use async_trait::async_trait;
use rmcp::model::{CallToolResult, Tool};
use rmcp::ErrorData as McpError;
use serde_json::Value;

use crate::error::{internal_error, method_not_found};

/// Error type for embeddable MCP operations
#[derive(Debug, thiserror::Error)]
pub enum EmbeddableError {
    /// Tool was not found in the server
    #[error("Unknown tool: {0}")]
    ToolNotFound(String),

    /// Arguments did not match the tool's input schema
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// An already-formed protocol error
    #[error("mcp error: {0:?}")]
    Mcp(McpError),
}

impl From<McpError> for EmbeddableError {
    fn from(err: McpError) -> Self {
        EmbeddableError::Mcp(err)
    }
}

impl From<EmbeddableError> for McpError {
    fn from(err: EmbeddableError) -> Self {
        match err {
            EmbeddableError::ToolNotFound(_) => method_not_found(err.to_string()),
            EmbeddableError::Mcp(inner) => inner,
            other => internal_error(other.to_string()),
        }
    }
}

/// Result type for embeddable MCP operations
pub type EmbeddableResult<T> = Result<T, EmbeddableError>;

/// Trait for MCP servers driven by the shared dispatcher
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`: each `tools/call` runs on its own
/// tokio task holding a shared reference to the server.
#[async_trait]
pub trait EmbeddableMcp: Send + Sync {
    /// Returns the server name reported in `serverInfo`
    fn server_name(&self) -> &str;

    /// Returns the static tool catalog
    ///
    /// Each tool includes its name, description, and input schema.
    fn list_tools(&self) -> Vec<Tool>;

    /// Executes a tool by name with the given arguments
    ///
    /// # Returns
    ///
    /// Returns the tool result on success, or an error if:
    /// - The tool is not found
    /// - The arguments do not match the tool's parameters
    /// - Tool execution fails at the protocol level
    async fn call_tool(&self, name: &str, params: Value) -> EmbeddableResult<CallToolResult>;

    /// Returns an optional description, surfaced as `instructions` on initialize
    fn server_description(&self) -> Option<&str> {
        None
    }

    /// Returns the server version, if available
    fn server_version(&self) -> Option<&str> {
        None
    }
}
