//! JSON-RPC 2.0 envelopes
//!
//! Requests are parsed leniently: any JSON object is a request. `jsonrpc`,
//! `id`, `method` and `params` are all optional and may have any type; a
//! missing `id` is echoed back as `null` and a non-string `method` is carried
//! in its JSON text form so that it dispatches as an unknown method.

use rmcp::ErrorData as McpError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// JSON-RPC version tag written on every response
pub const JSONRPC_VERSION: &str = "2.0";

/// MCP protocol revision announced during `initialize`
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// An incoming message
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonrpc: Option<String>,
    /// Correlation identifier, copied verbatim onto the response
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: impl Into<Value>, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: Some(JSONRPC_VERSION.to_string()),
            id: id.into(),
            method: Some(method.into()),
            params: Some(params),
        }
    }

    fn from_fields(mut fields: Map<String, Value>) -> Self {
        Self {
            jsonrpc: fields.remove("jsonrpc").map(text_of),
            id: fields.remove("id").unwrap_or(Value::Null),
            method: fields.remove("method").map(text_of),
            params: fields.remove("params"),
        }
    }

    /// Method name, or the empty string when the message carried none
    pub fn method(&self) -> &str {
        self.method.as_deref().unwrap_or_default()
    }

    /// `initialized` and the `notifications/*` family never get a reply
    pub fn is_notification(&self) -> bool {
        let method = self.method();
        method == "initialized" || method.starts_with("notifications/")
    }
}

/// Either half of a response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Result(Value),
    Error(McpError),
}

/// An outgoing message: `{"jsonrpc":"2.0","id":…,"result"|"error":…}`
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            outcome: Outcome::Result(result),
        }
    }

    pub fn error(id: Value, error: McpError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            outcome: Outcome::Error(error),
        }
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.outcome {
            Outcome::Result(value) => Some(value),
            Outcome::Error(_) => None,
        }
    }

    pub fn error_payload(&self) -> Option<&McpError> {
        match &self.outcome {
            Outcome::Result(_) => None,
            Outcome::Error(err) => Some(err),
        }
    }
}

/// Parse one transport line into a request
///
/// Only lines that are not JSON, or whose JSON is not an object, fail.
pub fn parse_request(line: &[u8]) -> Result<JsonRpcRequest, ParseError> {
    match serde_json::from_slice(line)? {
        Value::Object(fields) => Ok(JsonRpcRequest::from_fields(fields)),
        other => Err(ParseError::NotAnObject(json_kind(&other))),
    }
}

/// Why a transport line could not be read as a request
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// String fields keep their contents, anything else its JSON text
fn text_of(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}
