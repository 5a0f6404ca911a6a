//! Request dispatch
//!
//! Maps a parsed [`JsonRpcRequest`] onto the server behind [`EmbeddableMcp`]
//! and builds the matching [`JsonRpcResponse`]. The handshake is permissive:
//! requests that arrive before `initialize` are still served.

use std::any::Any;
use std::sync::Arc;

use rmcp::ErrorData as McpError;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::task::JoinError;
use tracing::{debug, info, warn};

use crate::embeddable::EmbeddableMcp;
use crate::error::{internal_error, method_not_found, McpResult};
use crate::protocol::{JsonRpcRequest, JsonRpcResponse, PROTOCOL_VERSION};

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Ready,
}

/// Params of a `tools/call` request
#[derive(Debug, Deserialize)]
struct CallToolParams {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<Value>,
}

/// Single-consumer dispatcher for one connection
pub struct Dispatcher<S> {
    server: Arc<S>,
    state: SessionState,
}

impl<S> Dispatcher<S>
where
    S: EmbeddableMcp + 'static,
{
    pub fn new(server: S) -> Self {
        Self::from_arc(Arc::new(server))
    }

    pub fn from_arc(server: Arc<S>) -> Self {
        Self {
            server,
            state: SessionState::Uninitialized,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn server(&self) -> &S {
        &self.server
    }

    /// Handle one message. Returns `None` for notifications.
    pub async fn dispatch(&mut self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let method = request.method().to_string();

        if request.is_notification() {
            if method == "initialized" || method == "notifications/initialized" {
                info!("Client finished initialization");
            } else {
                debug!(method = %method, "Ignoring notification");
            }
            return None;
        }

        if self.state == SessionState::Uninitialized && method != "initialize" {
            debug!(method = %method, "Request before initialize, handling anyway");
        }

        let outcome = match method.as_str() {
            "initialize" => Ok(self.initialize()),
            "ping" => Ok(json!({})),
            "tools/list" => self.list_tools(),
            "tools/call" => self.call_tool(request.params).await,
            other => Err(method_not_found(format!("Unknown method: {}", other))),
        };

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(request.id, result),
            Err(err) => {
                debug!(method = %method, code = err.code.0, message = %err.message, "Request failed");
                JsonRpcResponse::error(request.id, err)
            }
        })
    }

    fn initialize(&mut self) -> Value {
        self.state = SessionState::Ready;
        info!(server = self.server.server_name(), "Session initialized");

        let mut result = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": self.server.server_name(),
                "version": self.server.server_version().unwrap_or(env!("CARGO_PKG_VERSION")),
            },
        });
        if let Some(instructions) = self.server.server_description() {
            result["instructions"] = Value::String(instructions.to_string());
        }
        result
    }

    fn list_tools(&self) -> McpResult<Value> {
        let tools = self.server.list_tools();
        serde_json::to_value(tools)
            .map(|tools| json!({ "tools": tools }))
            .map_err(|e| internal_error(e.to_string()))
    }

    async fn call_tool(&self, params: Option<Value>) -> McpResult<Value> {
        let params: CallToolParams =
            serde_json::from_value(params.unwrap_or_else(|| json!({})))
                .map_err(|e| internal_error(format!("Invalid tools/call params: {}", e)))?;
        let name = params.name.unwrap_or_default();
        let arguments = match params.arguments {
            Some(Value::Null) | None => Value::Object(Map::new()),
            Some(arguments) => arguments,
        };

        debug!(tool = %name, "Calling tool");

        // A panic inside the handler comes back as a JoinError
        let server = Arc::clone(&self.server);
        let task = tokio::spawn(async move { server.call_tool(&name, arguments).await });

        let result = match task.await {
            Ok(result) => result.map_err(McpError::from)?,
            Err(err) => return Err(internal_error(join_error_message(err))),
        };

        serde_json::to_value(result).map_err(|e| internal_error(e.to_string()))
    }
}

fn join_error_message(err: JoinError) -> String {
    if !err.is_panic() {
        return "tool task was cancelled".to_string();
    }
    let message = panic_message(err.into_panic());
    warn!(panic = %message, "Tool handler panicked");
    message
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "tool handler panicked".to_string()
    }
}
