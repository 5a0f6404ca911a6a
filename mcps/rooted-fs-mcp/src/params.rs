//! Parameter types for the filesystem tools
//!
//! These structs are both the argument decoders for `tools/call` and, via
//! `schemars`, the `inputSchema` published by `tools/list`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListDirectoryParams {
    #[schemars(description = "Directory path to list")]
    pub path: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ReadFileParams {
    #[schemars(description = "File path to read")]
    pub path: String,

    #[schemars(description = "Text encoding (default: utf-8)")]
    #[serde(default = "default_encoding")]
    pub encoding: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SearchFilesParams {
    #[schemars(description = "Search pattern")]
    pub pattern: String,

    #[schemars(description = "Directory to search in (default: current)")]
    #[serde(default = "default_search_path")]
    pub path: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct FileInfoParams {
    #[schemars(description = "File or directory path")]
    pub path: String,
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

fn default_search_path() -> String {
    ".".to_string()
}
