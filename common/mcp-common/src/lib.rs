//! MCP Common - Shared plumbing for stdio MCP servers
//!
//! This crate provides the protocol side of an MCP server so that a server
//! crate only has to describe its tools:
//!
//! - **Protocol**: JSON-RPC 2.0 request/response envelopes
//! - **Dispatch**: the `initialize` → `tools/*` state machine
//! - **Transport**: newline-delimited JSON over any async reader/writer
//! - **Initialization**: tracing setup that keeps stdout clean
//! - **Results / Errors**: helpers for building `CallToolResult` and error payloads
//! - **Embeddable**: [`EmbeddableMcp`], the seam a server implements
//!
//! # Example
//!
//! ```rust,ignore
//! use mcp_common::{init_tracing, serve_stdio};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     init_tracing("my_mcp", 0)?;
//!     serve_stdio(MyServer::new()).await
//! }
//! ```

pub mod dispatch;
pub mod embeddable;
pub mod error;
pub mod init;
pub mod protocol;
pub mod result;
pub mod transport;

// Re-export commonly used items at crate root
pub use dispatch::{Dispatcher, SessionState};
pub use embeddable::{EmbeddableError, EmbeddableMcp, EmbeddableResult};
pub use error::{internal_error, method_not_found, McpResult};
pub use init::init_tracing;
pub use protocol::{
    JsonRpcRequest, JsonRpcResponse, ParseError, JSONRPC_VERSION, PROTOCOL_VERSION,
};
pub use result::json_success;
pub use transport::{serve_lines, serve_stdio};

// Re-export rmcp types that are commonly needed
pub use rmcp::{
    model::{CallToolResult, Content, ErrorCode, Tool},
    ErrorData as McpError,
};

// Re-export async_trait for implementing EmbeddableMcp
pub use async_trait::async_trait;
