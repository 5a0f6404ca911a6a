//! Result helpers for MCP tool responses

use rmcp::{
    model::{CallToolResult, Content},
    ErrorData as McpError,
};
use serde::Serialize;

/// Create a successful JSON response from any serializable data
///
/// The data is pretty-printed and carried as a single text content item,
/// which is the shape `tools/call` clients expect:
///
/// ```json
/// {"content": [{"type": "text", "text": "{\n  \"value\": 42\n}"}]}
/// ```
///
/// # Errors
///
/// Returns an internal error if serialization fails.
pub fn json_success<T: Serialize>(data: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
