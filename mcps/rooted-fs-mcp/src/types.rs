//! Type definitions for the rooted filesystem server

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sandbox::DenyRule;

// ============================================================================
// Configuration Types
// ============================================================================

/// Server configuration, usually loaded from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub read: ReadPolicy,
    #[serde(default)]
    pub sandbox: SandboxConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Limits {
    /// Maximum file size in bytes for read_file
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Deepest directory level search_files will enumerate
    #[serde(default = "default_max_search_depth")]
    pub max_search_depth: usize,
    /// Maximum matches returned by search_files
    #[serde(default = "default_max_search_results")]
    pub max_search_results: usize,
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024 // 10MB
}

fn default_max_search_depth() -> usize {
    5
}

fn default_max_search_results() -> usize {
    100
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            max_search_depth: default_max_search_depth(),
            max_search_results: default_max_search_results(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadPolicy {
    /// Extensions read_file will open, with leading dot
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

fn default_allowed_extensions() -> Vec<String> {
    [
        ".txt",
        ".md",
        ".json",
        ".yaml",
        ".yml",
        ".xml",
        ".csv",
        ".py",
        ".js",
        ".ts",
        ".html",
        ".css",
        ".sql",
        ".sh",
        ".bat",
        ".ps1",
        ".dockerfile",
        ".gitignore",
        ".env",
    ]
    .iter()
    .map(|ext| ext.to_string())
    .collect()
}

impl Default for ReadPolicy {
    fn default() -> Self {
        Self {
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

impl ReadPolicy {
    /// Whether `extension` (`".md"`, `"md"` or `""`) may be read
    pub fn allows(&self, extension: &str) -> bool {
        if extension.is_empty() {
            return false;
        }
        let wanted = extension.trim_start_matches('.').to_lowercase();
        self.allowed_extensions
            .iter()
            .any(|allowed| allowed.trim_start_matches('.').to_lowercase() == wanted)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Rules that reject a path even when it is under the root
    #[serde(default = "DenyRule::defaults")]
    pub deny: Vec<DenyRule>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            deny: DenyRule::defaults(),
        }
    }
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Directory,
    File,
}

impl EntryType {
    pub fn of(is_dir: bool) -> Self {
        if is_dir {
            EntryType::Directory
        } else {
            EntryType::File
        }
    }
}

/// Error payload returned inside a successful tool result
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Directory entry in a list_directory response
#[derive(Debug, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    /// Relative to the sandbox root
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

/// Response for list_directory
#[derive(Debug, Serialize, Deserialize)]
pub struct ListDirectoryResponse {
    pub path: String,
    pub items: Vec<FileEntry>,
}

/// Response for read_file
#[derive(Debug, Serialize, Deserialize)]
pub struct ReadFileResponse {
    pub path: String,
    pub content: String,
    /// Length of `content` in characters
    pub size: usize,
    pub encoding: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchMatch {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
}

/// Response for search_files
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchFilesResponse {
    pub pattern: String,
    pub search_path: String,
    pub matches: Vec<SearchMatch>,
    /// True when more matches existed than the result cap allowed
    pub limit_reached: bool,
}

/// Response for get_file_info
#[derive(Debug, Serialize, Deserialize)]
pub struct FileInfoResponse {
    pub path: String,
    pub name: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    /// Octal permission bits, e.g. `"644"`
    pub permissions: String,
    pub readonly: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    /// Whether read_file accepts this extension
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readable: Option<bool>,
}

// ============================================================================
// Error Types
// ============================================================================

/// Operation-level failures, reported to the caller as `{"error": ...}`
#[derive(Error, Debug)]
pub enum FsError {
    /// Sandbox rejection. Never names the path or the rule.
    #[error("Invalid or unsafe path")]
    UnsafePath,

    #[error("Path does not exist")]
    PathNotFound,

    #[error("File does not exist")]
    FileNotFound,

    #[error("Path is not a directory")]
    NotADirectory,

    #[error("Path is not a file")]
    NotAFile,

    /// `limit` is rendered by [`FsError::file_too_large`]
    #[error("File too large (max {limit})")]
    FileTooLarge { limit: String },

    #[error("File type {0} not allowed")]
    ExtensionNotAllowed(String),

    #[error("Unknown encoding: {0}")]
    UnknownEncoding(String),

    #[error("Cannot decode file with {0} encoding")]
    Decode(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),
}

impl FsError {
    /// Size-cap rejection: whole mebibytes as `10MB`, anything else in bytes
    pub fn file_too_large(max_bytes: u64) -> Self {
        const MIB: u64 = 1024 * 1024;
        let limit = if max_bytes >= MIB && max_bytes % MIB == 0 {
            format!("{}MB", max_bytes / MIB)
        } else {
            format!("{} bytes", max_bytes)
        };
        FsError::FileTooLarge { limit }
    }
}

pub type FsResult<T> = Result<T, FsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = Limits::default();
        assert_eq!(limits.max_file_size, 10 * 1024 * 1024);
        assert_eq!(limits.max_search_depth, 5);
        assert_eq!(limits.max_search_results, 100);
    }

    #[test]
    fn test_read_policy_allows() {
        let policy = ReadPolicy::default();
        assert!(policy.allows(".md"));
        assert!(policy.allows(".MD"));
        assert!(policy.allows("json"));
        assert!(!policy.allows(".exe"));
        assert!(!policy.allows(""));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [limits]
            max_file_size = 1024
            "#,
        )
        .unwrap();
        assert_eq!(config.limits.max_file_size, 1024);
        assert_eq!(config.limits.max_search_results, 100);
        assert_eq!(config.sandbox.deny, DenyRule::defaults());
        assert!(config.read.allows(".txt"));
    }

    #[test]
    fn test_deny_rules_from_toml() {
        let config: Config = toml::from_str(
            r#"
            [sandbox]
            deny = [{ segment = ".git" }, { substring = "password" }]
            "#,
        )
        .unwrap();
        assert_eq!(
            config.sandbox.deny,
            vec![
                DenyRule::Segment(".git".into()),
                DenyRule::Substring("password".into()),
            ]
        );
    }

    #[test]
    fn test_unsafe_path_message_is_generic() {
        assert_eq!(FsError::UnsafePath.to_string(), "Invalid or unsafe path");
        assert_eq!(
            FsError::file_too_large(10 * 1024 * 1024).to_string(),
            "File too large (max 10MB)"
        );
    }

    #[test]
    fn test_small_size_cap_is_reported_in_bytes() {
        assert_eq!(
            FsError::file_too_large(16).to_string(),
            "File too large (max 16 bytes)"
        );
        assert_eq!(
            FsError::file_too_large(1024 * 1024 + 1).to_string(),
            "File too large (max 1048577 bytes)"
        );
    }

    #[test]
    fn test_entry_type_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(EntryType::Directory).unwrap(),
            serde_json::json!("directory")
        );
    }
}
