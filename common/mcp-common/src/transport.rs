//! Newline-delimited JSON transport
//!
//! One request per line in, one response per line out. Lines that are not a
//! JSON object are logged and dropped: without an `id` there is nothing to
//! reply to. End of input ends the loop cleanly.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

use crate::dispatch::Dispatcher;
use crate::embeddable::EmbeddableMcp;
use crate::protocol::{parse_request, JsonRpcResponse};

/// Drive `dispatcher` from `reader` until end of input
///
/// Requests are handled strictly one at a time in arrival order. Each
/// response is written as a single line and flushed before the next line is
/// read.
///
/// # Errors
///
/// Returns an error only if reading the input stream or writing the output
/// stream fails.
pub async fn serve_lines<R, W, S>(
    mut reader: R,
    mut writer: W,
    dispatcher: &mut Dispatcher<S>,
) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    S: EmbeddableMcp + 'static,
{
    let mut line = Vec::new();

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            break;
        }

        let trimmed = line.trim_ascii();
        if trimmed.is_empty() {
            continue;
        }

        let request = match parse_request(trimmed) {
            Ok(request) => request,
            Err(e) => {
                error!(error = %e, "Unreadable request, skipping line");
                continue;
            }
        };

        debug!(method = request.method(), id = %request.id, "Received request");

        if let Some(response) = dispatcher.dispatch(request).await {
            write_response(&mut writer, &response).await?;
        }
    }

    info!("Input stream closed");
    Ok(())
}

async fn write_response<W>(writer: &mut W, response: &JsonRpcResponse) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut payload = serde_json::to_vec(response)?;
    payload.push(b'\n');
    writer.write_all(&payload).await?;
    writer.flush().await
}

/// Serve `server` over the process's stdin/stdout
///
/// tokio performs the blocking stdin read on its blocking pool, so the
/// runtime stays free to finish and flush already-computed responses.
pub async fn serve_stdio<S>(server: S) -> anyhow::Result<()>
where
    S: EmbeddableMcp + 'static,
{
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    let mut dispatcher = Dispatcher::new(server);

    info!(server = dispatcher.server().server_name(), "Serving MCP over stdio");
    serve_lines(stdin, stdout, &mut dispatcher).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddable::{EmbeddableError, EmbeddableResult};
    use crate::result::json_success;
    use async_trait::async_trait;
    use rmcp::model::{CallToolResult, Tool};
    use serde_json::Value;

    struct NullServer;

    #[async_trait]
    impl EmbeddableMcp for NullServer {
        fn server_name(&self) -> &str {
            "null"
        }

        fn list_tools(&self) -> Vec<Tool> {
            vec![]
        }

        async fn call_tool(&self, name: &str, params: Value) -> EmbeddableResult<CallToolResult> {
            match name {
                "echo" => Ok(json_success(&params)?),
                other => Err(EmbeddableError::ToolNotFound(other.to_string())),
            }
        }
    }

    async fn run(input: &str) -> Vec<Value> {
        let mut output = Vec::new();
        let mut dispatcher = Dispatcher::new(NullServer);
        serve_lines(input.as_bytes(), &mut output, &mut dispatcher)
            .await
            .unwrap();

        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_one_response_per_request_line() {
        let responses = run(concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"initialized"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
            "\n",
        ))
        .await;

        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[1]["id"], 2);
        assert_eq!(responses[1]["result"]["tools"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_malformed_line_is_skipped() {
        let responses = run(concat!(
            "this is not json\n",
            r#"{"id":"after","method":"ping"}"#,
            "\n",
        ))
        .await;

        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["id"], "after");
    }

    #[tokio::test]
    async fn test_wrongly_typed_fields_still_get_a_reply() {
        let responses = run(concat!(
            r#"{"id":7,"method":5}"#,
            "\n",
            r#"{"jsonrpc":2,"id":8,"method":"ping"}"#,
            "\n",
            "[1,2,3]\n",
            r#"{"id":9,"method":"ping"}"#,
            "\n",
        ))
        .await;

        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["id"], 7);
        assert_eq!(responses[0]["error"]["code"], -32601);
        assert_eq!(responses[0]["error"]["message"], "Unknown method: 5");
        assert_eq!(responses[1]["id"], 8);
        assert_eq!(responses[1]["result"], serde_json::json!({}));
        assert_eq!(responses[2]["id"], 9);
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_is_skipped() {
        let mut input = b"\xff\xfe\n".to_vec();
        input.extend_from_slice(b"{\"id\":3,\"method\":\"ping\"}\n");

        let mut output = Vec::new();
        let mut dispatcher = Dispatcher::new(NullServer);
        serve_lines(&input[..], &mut output, &mut dispatcher)
            .await
            .unwrap();

        let text = String::from_utf8(output).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_blank_lines_and_missing_trailing_newline() {
        let responses = run("\n   \n{\"id\":9,\"method\":\"ping\"}").await;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["id"], 9);
    }

    #[tokio::test]
    async fn test_each_response_is_a_single_line() {
        let responses = run(concat!(
            r#"{"id":1,"method":"tools/call","params":{"name":"echo","arguments":{"a":[1,2,3]}}}"#,
            "\n",
        ))
        .await;
        assert_eq!(responses.len(), 1);
        assert!(responses[0]["result"]["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains('\n'));
    }

    #[tokio::test]
    async fn test_empty_input_ends_cleanly() {
        assert!(run("").await.is_empty());
    }
}
