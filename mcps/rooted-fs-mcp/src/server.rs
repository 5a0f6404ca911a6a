//! MCP server for rooted filesystem access
//!
//! This module defines the server that exposes the four read-only tools and
//! the configuration loading. Handler implementations are in the handlers
//! module; protocol handling lives in `mcp_common`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use mcp_common::{EmbeddableError, EmbeddableMcp, EmbeddableResult};
use rmcp::model::{CallToolResult, Tool};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::handlers;
use crate::params::*;
use crate::sandbox::Sandbox;
use crate::types::{Config, FsError, FsResult};

/// Name reported in `serverInfo`
pub const SERVER_NAME: &str = "rooted-fs";

/// The rooted filesystem MCP server
#[derive(Clone)]
pub struct RootedFsServer {
    sandbox: Arc<Sandbox>,
    config: Arc<Config>,
}

impl RootedFsServer {
    /// Create a server confined to `root`
    pub fn new(root: impl AsRef<Path>, config: Config) -> FsResult<Self> {
        let sandbox = Sandbox::new(root, config.sandbox.deny.clone())?;
        tracing::info!(
            root = %sandbox.root().display(),
            deny_rules = sandbox.rules().len(),
            "Filesystem sandbox ready"
        );

        Ok(Self {
            sandbox: Arc::new(sandbox),
            config: Arc::new(config),
        })
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Load config from an explicit file or the standard locations
///
/// Config is searched in order:
/// 1. `explicit` (the `--config` flag or `ROOTED_FS_CONFIG`); errors are fatal
/// 2. `./rooted-fs.toml`
/// 3. `$XDG_CONFIG_HOME/rooted-fs/config.toml`
/// 4. Default config if none found
pub fn load_config(explicit: Option<&Path>) -> FsResult<Config> {
    if let Some(path) = explicit {
        let content = std::fs::read_to_string(path)
            .map_err(|e| FsError::Config(format!("{}: {}", path.display(), e)))?;
        let config = toml::from_str::<Config>(&content)
            .map_err(|e| FsError::Config(format!("{}: {}", path.display(), e)))?;
        tracing::info!("Loaded config from {}", path.display());
        return Ok(config);
    }

    let mut config_paths = vec![PathBuf::from("rooted-fs.toml")];
    if let Some(config_dir) = dirs::config_dir() {
        config_paths.push(config_dir.join("rooted-fs").join("config.toml"));
    }

    for path in config_paths {
        if !path.exists() {
            continue;
        }
        match std::fs::read_to_string(&path).map(|content| toml::from_str::<Config>(&content)) {
            Ok(Ok(config)) => {
                tracing::info!("Loaded config from {}", path.display());
                return Ok(config);
            }
            Ok(Err(e)) => {
                tracing::warn!("Failed to parse config {}: {}", path.display(), e);
            }
            Err(e) => {
                tracing::warn!("Failed to read config {}: {}", path.display(), e);
            }
        }
    }

    tracing::info!("Using default configuration");
    Ok(Config::default())
}

// ============================================================================
// Tool Catalog
// ============================================================================

/// JSON schema object for a parameter struct
fn input_schema<T: JsonSchema>() -> Arc<Map<String, Value>> {
    let mut schema = match serde_json::to_value(schemars::schema_for!(T)) {
        Ok(Value::Object(schema)) => schema,
        _ => Map::new(),
    };
    schema.remove("$schema");
    schema.remove("title");
    Arc::new(schema)
}

/// The four tools, in a fixed order
pub fn tool_catalog() -> Vec<Tool> {
    vec![
        Tool::new(
            "list_directory",
            "List contents of a directory. Directories come first, then files, each sorted by name.",
            input_schema::<ListDirectoryParams>(),
        ),
        Tool::new(
            "read_file",
            "Read contents of a text file. Only files with an allowed extension and at most 10MB can be read.",
            input_schema::<ReadFileParams>(),
        ),
        Tool::new(
            "search_files",
            "Search for files and directories whose name contains the pattern (case-insensitive).",
            input_schema::<SearchFilesParams>(),
        ),
        Tool::new(
            "get_file_info",
            "Get information about a file or directory: type, size, timestamps and permissions.",
            input_schema::<FileInfoParams>(),
        ),
    ]
}

fn parse_params<T: DeserializeOwned>(tool: &str, params: Value) -> EmbeddableResult<T> {
    serde_json::from_value(params)
        .map_err(|e| EmbeddableError::InvalidParams(format!("{}: {}", tool, e)))
}

// ============================================================================
// Server Handler Implementation
// ============================================================================

#[async_trait]
impl EmbeddableMcp for RootedFsServer {
    fn server_name(&self) -> &str {
        SERVER_NAME
    }

    fn server_description(&self) -> Option<&str> {
        Some(
            "Read-only filesystem access confined to a single root directory. \
             Relative paths are resolved against the root.",
        )
    }

    fn server_version(&self) -> Option<&str> {
        Some(env!("CARGO_PKG_VERSION"))
    }

    fn list_tools(&self) -> Vec<Tool> {
        tool_catalog()
    }

    async fn call_tool(&self, name: &str, params: Value) -> EmbeddableResult<CallToolResult> {
        let result = match name {
            "list_directory" => handlers::into_tool_result(
                handlers::list_directory(&self.sandbox, parse_params(name, params)?).await,
            ),
            "read_file" => handlers::into_tool_result(
                handlers::read_file(&self.sandbox, &self.config, parse_params(name, params)?)
                    .await,
            ),
            "search_files" => handlers::into_tool_result(
                handlers::search_files(
                    &self.sandbox,
                    &self.config.limits,
                    parse_params(name, params)?,
                )
                .await,
            ),
            "get_file_info" => handlers::into_tool_result(
                handlers::get_file_info(&self.sandbox, &self.config, parse_params(name, params)?)
                    .await,
            ),
            other => return Err(EmbeddableError::ToolNotFound(other.to_string())),
        };

        Ok(result?)
    }
}
