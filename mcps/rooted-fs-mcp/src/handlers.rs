//! Filesystem operation handlers
//!
//! Each handler resolves its path through the sandbox before touching the
//! filesystem. Failures come back as [`FsError`] and are turned into an
//! `{"error": ...}` payload by [`into_tool_result`]; they never surface as
//! protocol errors.

use std::borrow::Cow;
use std::path::Path;

use chrono::{DateTime, Utc};
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE};
use mcp_common::json_success;
use rmcp::{model::CallToolResult, ErrorData as McpError};
use serde::Serialize;
use tokio::fs;
use tracing::debug;

use crate::params::*;
use crate::sandbox::Sandbox;
use crate::types::{
    Config, EntryType, ErrorResponse, FileEntry, FileInfoResponse, FsError, FsResult, Limits,
    ListDirectoryResponse, ReadFileResponse, SearchFilesResponse, SearchMatch,
};

// ============================================================================
// Helper Functions
// ============================================================================

/// Serialize an operation outcome as tool content
pub fn into_tool_result<T: Serialize>(outcome: FsResult<T>) -> Result<CallToolResult, McpError> {
    match outcome {
        Ok(response) => json_success(&response),
        Err(err) => {
            debug!(error = %err, "Filesystem operation refused");
            json_success(&ErrorResponse {
                error: err.to_string(),
            })
        }
    }
}

fn resolve(sandbox: &Sandbox, path: &str) -> FsResult<std::path::PathBuf> {
    sandbox.resolve(path).map_err(|rejection| {
        debug!(%rejection, "Sandbox rejected path");
        FsError::UnsafePath
    })
}

/// Stat a path, mapping "not found" onto `missing`
async fn metadata_or(path: &Path, missing: FsError) -> FsResult<std::fs::Metadata> {
    match fs::metadata(path).await {
        Ok(metadata) => Ok(metadata),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(missing),
        Err(e) => Err(e.into()),
    }
}

/// Extension with its leading dot, or `""`
fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(unix)]
fn permission_bits(metadata: &std::fs::Metadata) -> String {
    use std::os::unix::fs::PermissionsExt;
    format!("{:03o}", metadata.permissions().mode() & 0o777)
}

#[cfg(not(unix))]
fn permission_bits(metadata: &std::fs::Metadata) -> String {
    if metadata.permissions().readonly() {
        "444".to_string()
    } else {
        "666".to_string()
    }
}

/// Entry names of `dir` in name order
async fn sorted_children(dir: &Path) -> std::io::Result<Vec<std::path::PathBuf>> {
    let mut read_dir = fs::read_dir(dir).await?;
    let mut children = Vec::new();
    while let Some(entry) = read_dir.next_entry().await? {
        children.push(entry.path());
    }
    children.sort();
    Ok(children)
}

// ============================================================================
// Text Decoding
// ============================================================================

/// Encodings read_file can decode
///
/// `ascii` and `latin-1` keep their strict meanings; the WHATWG table maps
/// both labels to windows-1252. Every other label goes through `encoding_rs`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextEncoding {
    Ascii,
    Latin1,
    Labelled(&'static Encoding),
}

impl TextEncoding {
    pub fn from_label(label: &str) -> FsResult<Self> {
        let normalized = label.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "ascii" | "us-ascii" => Ok(TextEncoding::Ascii),
            "latin-1" | "latin1" | "iso-8859-1" | "iso8859-1" | "l1" => Ok(TextEncoding::Latin1),
            _ => Encoding::for_label(label.as_bytes())
                .or_else(|| Encoding::for_label(normalized.as_bytes()))
                .map(TextEncoding::Labelled)
                .ok_or_else(|| FsError::UnknownEncoding(label.to_string())),
        }
    }

    /// Decode `bytes`, or `None` if they are not valid in this encoding
    pub fn decode(self, bytes: Vec<u8>) -> Option<String> {
        match self {
            TextEncoding::Ascii if bytes.is_ascii() => String::from_utf8(bytes).ok(),
            TextEncoding::Ascii => None,
            TextEncoding::Latin1 => Some(bytes.into_iter().map(char::from).collect()),
            TextEncoding::Labelled(encoding) => {
                // A UTF-16 BOM picks the byte order and is not part of the text
                let (encoding, body) = match Encoding::for_bom(&bytes) {
                    Some((bom, len)) if is_utf16(encoding) && is_utf16(bom) => {
                        (bom, &bytes[len..])
                    }
                    _ => (encoding, &bytes[..]),
                };
                encoding
                    .decode_without_bom_handling_and_without_replacement(body)
                    .map(Cow::into_owned)
            }
        }
    }
}

fn is_utf16(encoding: &'static Encoding) -> bool {
    encoding == UTF_16LE || encoding == UTF_16BE
}

// ============================================================================
// Handler Functions
// ============================================================================

pub async fn list_directory(
    sandbox: &Sandbox,
    params: ListDirectoryParams,
) -> FsResult<ListDirectoryResponse> {
    let dir = resolve(sandbox, &params.path)?;

    let metadata = metadata_or(&dir, FsError::PathNotFound).await?;
    if !metadata.is_dir() {
        return Err(FsError::NotADirectory);
    }

    let mut items = Vec::new();
    for child in sorted_children(&dir).await? {
        // Symlinks leading out of the root or into denied areas are hidden
        let Ok(resolved) = sandbox.resolve_path(&child) else {
            continue;
        };

        let stat = fs::metadata(&resolved).await.ok();
        let is_dir = stat.as_ref().is_some_and(|m| m.is_dir());
        let file_stat = stat.filter(|m| m.is_file());

        items.push(FileEntry {
            name: file_name_of(&child),
            entry_type: EntryType::of(is_dir),
            path: sandbox.relative_path(&child),
            size: file_stat.as_ref().map(|m| m.len()),
            modified: file_stat
                .as_ref()
                .and_then(|m| m.modified().ok())
                .map(DateTime::<Utc>::from),
        });
    }

    // Directories first, then files, each case-insensitively by name
    items.sort_by_cached_key(|item| {
        (
            item.entry_type == EntryType::File,
            item.name.to_lowercase(),
            item.name.clone(),
        )
    });

    Ok(ListDirectoryResponse {
        path: params.path,
        items,
    })
}

pub async fn read_file(
    sandbox: &Sandbox,
    config: &Config,
    params: ReadFileParams,
) -> FsResult<ReadFileResponse> {
    let path = resolve(sandbox, &params.path)?;

    let metadata = metadata_or(&path, FsError::FileNotFound).await?;
    if !metadata.is_file() {
        return Err(FsError::NotAFile);
    }

    let max = config.limits.max_file_size;
    if metadata.len() > max {
        return Err(FsError::file_too_large(max));
    }

    let extension = extension_of(&path);
    if !config.read.allows(&extension) {
        return Err(FsError::ExtensionNotAllowed(extension));
    }

    let encoding = TextEncoding::from_label(&params.encoding)?;
    let bytes = fs::read(&path).await?;
    let content = encoding
        .decode(bytes)
        .ok_or_else(|| FsError::Decode(params.encoding.clone()))?;

    Ok(ReadFileResponse {
        path: params.path,
        size: content.chars().count(),
        content,
        encoding: params.encoding,
    })
}

pub async fn search_files(
    sandbox: &Sandbox,
    limits: &Limits,
    params: SearchFilesParams,
) -> FsResult<SearchFilesResponse> {
    let start = resolve(sandbox, &params.path)?;

    let metadata = metadata_or(&start, FsError::PathNotFound).await?;
    if !metadata.is_dir() {
        return Err(FsError::NotADirectory);
    }

    let needle = params.pattern.to_lowercase();
    let mut matches = Vec::new();
    let mut limit_reached = false;

    // Depth-first worklist of (directory, depth)
    let mut pending = vec![(start, 0usize)];

    'walk: while let Some((dir, depth)) = pending.pop() {
        let children = match sorted_children(&dir).await {
            Ok(children) => children,
            Err(e) => {
                debug!(dir = %sandbox.relative_path(&dir), error = %e, "Skipping unreadable directory");
                continue;
            }
        };

        let mut subdirs = Vec::new();
        for child in children {
            let Ok(resolved) = sandbox.resolve_path(&child) else {
                continue;
            };
            let is_dir = fs::metadata(&resolved)
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false);
            let name = file_name_of(&child);

            if name.to_lowercase().contains(&needle) {
                // Only a match past the cap means results were dropped
                if matches.len() >= limits.max_search_results {
                    limit_reached = true;
                    break 'walk;
                }
                matches.push(SearchMatch {
                    name,
                    path: sandbox.relative_path(&child),
                    entry_type: EntryType::of(is_dir),
                });
            }

            if is_dir && depth < limits.max_search_depth {
                subdirs.push(child);
            }
        }

        // Reversed so the first subdirectory is walked first
        pending.extend(subdirs.into_iter().rev().map(|d| (d, depth + 1)));
    }

    Ok(SearchFilesResponse {
        pattern: params.pattern,
        search_path: params.path,
        matches,
        limit_reached,
    })
}

pub async fn get_file_info(
    sandbox: &Sandbox,
    config: &Config,
    params: FileInfoParams,
) -> FsResult<FileInfoResponse> {
    let path = resolve(sandbox, &params.path)?;

    let metadata = metadata_or(&path, FsError::PathNotFound).await?;
    let is_file = metadata.is_file();

    let (extension, readable) = if is_file {
        let extension = extension_of(&path);
        let readable = config.read.allows(&extension);
        (Some(extension), Some(readable))
    } else {
        (None, None)
    };

    Ok(FileInfoResponse {
        path: params.path,
        name: file_name_of(&path),
        entry_type: EntryType::of(metadata.is_dir()),
        size: metadata.len(),
        modified: metadata.modified().ok().map(DateTime::<Utc>::from),
        created: metadata.created().ok().map(DateTime::<Utc>::from),
        permissions: permission_bits(&metadata),
        readonly: metadata.permissions().readonly(),
        extension,
        readable,
    })
}
