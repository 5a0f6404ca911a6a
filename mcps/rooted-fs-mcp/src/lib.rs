//! Rooted Filesystem MCP Library
//!
//! Read-only filesystem server confined to a single root directory.
//! Provides directory listing, file reading, name search and file info, with
//! every path checked by the [`Sandbox`](sandbox::Sandbox) first.
//!
//! # Usage as Library
//!
//! ```rust,ignore
//! use mcp_common::EmbeddableMcp;
//! use rooted_fs_mcp::{Config, RootedFsServer};
//!
//! let server = RootedFsServer::new("/srv/project", Config::default())?;
//! let result = server
//!     .call_tool("list_directory", serde_json::json!({"path": "."}))
//!     .await?;
//! ```

pub mod handlers;
pub mod installer;
pub mod params;
pub mod sandbox;
pub mod server;
pub mod types;

// Re-export main server type
pub use server::{load_config, RootedFsServer, SERVER_NAME};
pub use types::Config;

// Re-export parameter types for direct API usage
pub use params::*;
