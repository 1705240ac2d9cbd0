//! MCP Server implementation
//!
//! This module implements the MCP server that handles line-delimited
//! JSON-RPC over stdio. Each request is served on its own task; responses
//! go through a single writer so lines never interleave.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::ToolError;
use crate::protocol::{self, Request, RequestId, Response, RpcError};
use crate::tools::{self, ToolResult};

/// Server information
pub const SERVER_NAME: &str = "mcp-c64";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PROTOCOL_VERSION: &str = "2025-06-18";

/// Tool handler trait
///
/// Implement this trait to handle tool calls. Errors are wrapped into a
/// uniform JSON-RPC error by the server.
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync {
    /// Handle a tool call
    async fn call(&self, name: &str, arguments: Value) -> Result<ToolResult, ToolError>;
}

/// MCP Server
pub struct McpServer<H: ToolHandler> {
    handler: Arc<H>,
    initialized: Arc<AtomicBool>,
}

impl<H: ToolHandler> Clone for McpServer<H> {
    fn clone(&self) -> Self {
        McpServer {
            handler: self.handler.clone(),
            initialized: self.initialized.clone(),
        }
    }
}

impl<H: ToolHandler + 'static> McpServer<H> {
    /// Create a new MCP server with a tool handler
    pub fn new(handler: H) -> Self {
        McpServer {
            handler: Arc::new(handler),
            initialized: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether `initialize` has been received
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Run the server on stdio
    pub async fn run(&self) -> anyhow::Result<()> {
        info!("Starting MCP server on stdio");
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve requests from `reader` until EOF, writing responses to `writer`.
    ///
    /// Returns after every in-flight request has been answered.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> anyhow::Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel::<Response>();
        let writer_task = tokio::spawn(write_responses(writer, rx));

        let mut reader = BufReader::new(reader);
        let mut in_flight = JoinSet::new();
        // Raw bytes; non-UTF-8 lines are answered with a parse error
        let mut line = Vec::new();
        loop {
            line.clear();
            let bytes_read = reader.read_until(b'\n', &mut line).await?;

            if bytes_read == 0 {
                info!("EOF received, shutting down");
                break;
            }

            let message = line.trim_ascii();
            if message.is_empty() {
                continue;
            }

            debug!("Received: {}", String::from_utf8_lossy(message));

            let server = self.clone();
            let message = message.to_vec();
            let tx = tx.clone();
            in_flight.spawn(async move {
                if let Some(response) = server.handle_message(&message).await {
                    // Receiver only goes away when the writer failed
                    let _ = tx.send(response);
                }
            });

            // Reap finished tasks so the set does not grow unbounded
            while in_flight.try_join_next().is_some() {}
        }

        while in_flight.join_next().await.is_some() {}
        drop(tx);

        writer_task.await??;
        Ok(())
    }

    /// Handle a single JSON-RPC message. Notifications yield no response.
    async fn handle_message(&self, message: &[u8]) -> Option<Response> {
        match protocol::parse_request(message) {
            Ok(request) => self.handle_request(request).await,
            Err(err) => Some(Response::from_error(RequestId::Null, err)),
        }
    }

    /// Handle a parsed request
    async fn handle_request(&self, request: Request) -> Option<Response> {
        let Some(id) = request.id else {
            self.handle_notification(&request.method);
            return None;
        };
        let method = request.method.as_str();
        let params = request.params.unwrap_or(Value::Null);

        let response = match method {
            "initialize" => self.handle_initialize(id, params),
            "tools/list" => self.handle_tools_list(id),
            "tools/call" => self.handle_tools_call(id, params).await,
            "ping" => Response::success(id, json!({})),
            _ => {
                warn!("Unknown method: {}", method);
                Response::from_error(id, RpcError::MethodNotFound(method.to_string()))
            }
        };
        Some(response)
    }

    fn handle_notification(&self, method: &str) {
        match method {
            "notifications/initialized" => debug!("Client finished initialization"),
            other => debug!("Ignoring notification: {}", other),
        }
    }

    /// Handle initialize request
    fn handle_initialize(&self, id: RequestId, _params: Value) -> Response {
        self.initialized.store(true, Ordering::SeqCst);
        info!("MCP server initialized");

        let result = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {},
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": SERVER_VERSION,
            }
        });

        Response::success(id, result)
    }

    /// Handle tools/list request
    fn handle_tools_list(&self, id: RequestId) -> Response {
        let tools = tools::all_tools();
        Response::success(id, json!({ "tools": tools }))
    }

    /// Handle tools/call request
    async fn handle_tools_call(&self, id: RequestId, params: Value) -> Response {
        // Extract tool name and arguments
        let name = match params.get("name").and_then(|v| v.as_str()) {
            Some(n) => n.to_string(),
            None => {
                return Response::from_error(
                    id,
                    RpcError::InvalidParams("Missing 'name' field".to_string()),
                );
            }
        };

        let arguments = params
            .get("arguments")
            .cloned()
            .unwrap_or(Value::Object(serde_json::Map::new()));

        debug!("Calling tool: {} with args: {:?}", name, arguments);

        match self.handler.call(&name, arguments).await {
            Ok(result) => match serde_json::to_value(result) {
                Ok(value) => Response::success(id, value),
                Err(e) => Response::from_error(id, RpcError::InternalError(e.to_string())),
            },
            Err(err) => {
                warn!(tool = %name, kind = err.kind(), error = %err, "Tool call failed");
                Response::from_error(id, err.into_rpc_error())
            }
        }
    }
}

/// Drain the response channel into `writer`, one JSON object per line.
async fn write_responses<W>(
    mut writer: W,
    mut rx: mpsc::UnboundedReceiver<Response>,
) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let response_json = protocol::serialize_response_string(&response)?;

        debug!("Sending: {}", response_json);

        writer.write_all(response_json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{duplex, AsyncReadExt};

    struct TestHandler;

    #[async_trait::async_trait]
    impl ToolHandler for TestHandler {
        async fn call(&self, name: &str, arguments: Value) -> Result<ToolResult, ToolError> {
            match name {
                "assemble_program" => {
                    if let Some(ms) = arguments.get("delayMs").and_then(|v| v.as_u64()) {
                        tokio::time::sleep(Duration::from_millis(ms)).await;
                    }
                    Ok(ToolResult::structured(&json!({ "output": "OK\n", "status": 0 })))
                }
                other => Err(ToolError::UnknownTool(other.to_string())),
            }
        }
    }

    fn request(id: i64, method: &str, params: Option<Value>) -> Request {
        Request::new(id, method, params)
    }

    /// Feed `input` through `serve` and collect the response lines.
    async fn serve_lines(input: &str) -> Vec<Value> {
        serve_bytes(input.as_bytes()).await
    }

    async fn serve_bytes(input: &[u8]) -> Vec<Value> {
        let server = McpServer::new(TestHandler);
        let (mut client_out, server_in) = duplex(64 * 1024);
        let (server_out, mut client_in) = duplex(64 * 1024);

        client_out.write_all(input).await.unwrap();
        drop(client_out);

        server.serve(server_in, server_out).await.unwrap();

        let mut output = String::new();
        client_in.read_to_string(&mut output).await.unwrap();
        output
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_handle_initialize() {
        let server = McpServer::new(TestHandler);
        let response = server
            .handle_request(request(1, "initialize", Some(json!({}))))
            .await
            .unwrap();

        assert!(response.error.is_none());
        let result = response.result.unwrap();
        assert_eq!(result["serverInfo"]["name"], "mcp-c64");
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["capabilities"], json!({ "tools": {} }));
        assert!(server.is_initialized());
    }

    #[tokio::test]
    async fn test_handle_tools_list() {
        let server = McpServer::new(TestHandler);
        let response = server.handle_tools_list(RequestId::Number(1));

        let result = response.result.unwrap();
        let tools = result["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], "assemble_program");
        assert!(tools[0]["inputSchema"].is_object());
    }

    #[tokio::test]
    async fn test_handle_tools_call() {
        let server = McpServer::new(TestHandler);
        let params = json!({
            "name": "assemble_program",
            "arguments": { "fileName": "hello.asm" }
        });

        let response = server.handle_tools_call(RequestId::Number(1), params).await;
        let result = response.result.unwrap();
        assert_eq!(result["structuredContent"]["output"], "OK\n");
        assert_eq!(result["content"][0]["type"], "text");
    }

    #[tokio::test]
    async fn test_unknown_tool_is_wrapped() {
        let server = McpServer::new(TestHandler);
        let params = json!({ "name": "foo_bar", "arguments": {} });

        let response = server.handle_tools_call(RequestId::Number(7), params).await;
        assert!(response.result.is_none());
        let error = response.error.unwrap();
        assert_eq!(error.code, -32603);
        assert_eq!(error.message, "Error processing request: Unknown tool: foo_bar");
        assert_eq!(error.data.unwrap()["kind"], "unknown_tool");
    }

    #[tokio::test]
    async fn test_tools_call_without_name() {
        let server = McpServer::new(TestHandler);
        let response = server
            .handle_tools_call(RequestId::Number(1), json!({ "arguments": {} }))
            .await;
        assert_eq!(response.error.unwrap().code, -32602);
    }

    #[tokio::test]
    async fn test_handle_unknown_method() {
        let server = McpServer::new(TestHandler);
        let response = server
            .handle_request(request(1, "unknown/method", None))
            .await
            .unwrap();

        assert_eq!(response.error.unwrap().code, -32601);
    }

    #[tokio::test]
    async fn test_notification_gets_no_response() {
        let server = McpServer::new(TestHandler);
        let notification = Request::notification("notifications/initialized", None);
        assert!(server.handle_request(notification).await.is_none());
    }

    #[tokio::test]
    async fn test_serve_session() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#, "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#, "\n",
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#, "\n",
            "this is not json\n",
        );

        let responses = serve_lines(input).await;
        assert_eq!(responses.len(), 3);

        let by_id = |id: i64| responses.iter().find(|r| r["id"] == id).unwrap();
        assert_eq!(by_id(1)["result"]["serverInfo"]["name"], "mcp-c64");
        assert_eq!(by_id(2)["result"]["tools"][0]["name"], "assemble_program");

        let parse_error = responses.iter().find(|r| r["id"].is_null()).unwrap();
        assert_eq!(parse_error["error"]["code"], -32700);
    }

    #[tokio::test]
    async fn test_serve_answers_concurrently() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","#,
            r#""params":{"name":"assemble_program","arguments":{"delayMs":300}}}"#, "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#, "\n",
        );

        let responses = serve_lines(input).await;
        assert_eq!(responses.len(), 2);
        // The slow call must not hold up the ping
        assert_eq!(responses[0]["id"], 2);
        assert_eq!(responses[1]["id"], 1);
        assert_eq!(responses[1]["result"]["structuredContent"]["status"], 0);
    }

    #[tokio::test]
    async fn test_serve_survives_invalid_utf8() {
        let mut input = Vec::new();
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#);
        input.extend_from_slice(b"\n\xff\xfe garbage\n");
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#);
        input.push(b'\n');

        let responses = serve_bytes(&input).await;
        assert_eq!(responses.len(), 3);

        for id in [1, 2] {
            let pong = responses.iter().find(|r| r["id"] == id).unwrap();
            assert_eq!(pong["result"], json!({}));
        }
        let parse_error = responses.iter().find(|r| r["id"].is_null()).unwrap();
        assert_eq!(parse_error["error"]["code"], -32700);
    }

    #[tokio::test]
    async fn test_null_id_is_answered() {
        let server = McpServer::new(TestHandler);
        let response = server
            .handle_message(br#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#)
            .await
            .unwrap();

        assert_eq!(response.id, RequestId::Null);
        assert_eq!(response.result, Some(json!({})));
    }
}
