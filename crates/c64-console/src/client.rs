//! Stdio MCP client session
//!
//! One `McpClient` per connected server. Requests are correlated with
//! responses by id through a pending map fed by a background reader task.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info, warn};

use c64_mcp::protocol::{Request, RequestId, Response};
use c64_mcp::{ToolDefinition, ToolResult};

const CLIENT_NAME: &str = "c64-console";
const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");
const PROTOCOL_VERSION: &str = "2025-06-18";

/// A server that has not answered `initialize` by then is not an MCP server
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

type PendingMap = Arc<Mutex<HashMap<i64, oneshot::Sender<Response>>>>;
type BoxedWriter = Box<dyn AsyncWrite + Unpin + Send>;

/// Connected MCP session
pub struct McpClient {
    writer: Mutex<BoxedWriter>,
    pending: PendingMap,
    next_id: AtomicI64,
    reader_alive: Arc<AtomicBool>,
    server_info: Value,
    /// Per-request limit after the handshake; `None` waits as long as the
    /// server takes, like the assembler itself
    request_timeout: Option<Duration>,
    /// Keep the server alive; kill_on_drop fires when the client goes away.
    _child: Option<Child>,
}

impl McpClient {
    /// Launch `command` as an MCP server and complete the handshake.
    pub async fn spawn(command: &str, args: &[String]) -> Result<Self> {
        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn MCP server: {}", command))?;

        let stdin = child.stdin.take().ok_or_else(|| anyhow!("No stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| anyhow!("No stdout"))?;

        // Server logs go to stderr; keep them out of the prompt
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!("server stderr: {}", line);
                }
            });
        }

        let mut client = Self::connect(stdout, stdin).await?;
        client._child = Some(child);
        Ok(client)
    }

    /// Run the handshake over an already established transport.
    pub async fn connect<R, W>(reader: R, writer: W) -> Result<Self>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let reader_alive = Arc::new(AtomicBool::new(true));
        tokio::spawn(read_responses(reader, pending.clone(), reader_alive.clone()));

        let mut client = McpClient {
            writer: Mutex::new(Box::new(writer)),
            pending,
            next_id: AtomicI64::new(1),
            reader_alive,
            server_info: Value::Null,
            request_timeout: None,
            _child: None,
        };

        let init = client
            .request_within(
                "initialize",
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": { "name": CLIENT_NAME, "version": CLIENT_VERSION }
                }),
                Some(HANDSHAKE_TIMEOUT),
            )
            .await
            .context("MCP handshake failed")?;
        client.server_info = init.get("serverInfo").cloned().unwrap_or(Value::Null);

        client.notify("notifications/initialized").await?;
        info!(server = %client.server_info, "Connected to MCP server");
        Ok(client)
    }

    /// Limit every later request to `timeout`
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// `serverInfo` reported during the handshake
    pub fn server_info(&self) -> &Value {
        &self.server_info
    }

    pub fn is_alive(&self) -> bool {
        self.reader_alive.load(Ordering::SeqCst)
    }

    /// Send a request and wait for its result.
    ///
    /// A JSON-RPC error response becomes an `Err` carrying the server's message.
    pub async fn request(&self, method: &str, params: Value) -> Result<Value> {
        self.request_within(method, params, self.request_timeout).await
    }

    async fn request_within(
        &self,
        method: &str,
        params: Value,
        timeout: Option<Duration>,
    ) -> Result<Value> {
        if !self.is_alive() {
            return Err(anyhow!("Not connected to server"));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        // The reader clears the map after marking itself dead; re-check so
        // an entry inserted after that clear is not left waiting.
        if !self.is_alive() {
            self.pending.lock().await.remove(&id);
            return Err(anyhow!("Not connected to server"));
        }

        if let Err(e) = self.send(&Request::new(id, method, Some(params))).await {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        let received = match timeout {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(received) => received,
                Err(_) => {
                    self.pending.lock().await.remove(&id);
                    return Err(anyhow!("'{}' timed out after {:?}", method, limit));
                }
            },
            None => rx.await,
        };
        let response = received.map_err(|_| anyhow!("Server closed the connection"))?;

        if let Some(err) = response.error {
            return Err(anyhow!("{}", err.message));
        }
        response
            .result
            .ok_or_else(|| anyhow!("Missing result in response to '{}'", method))
    }

    /// Send a notification (no response expected)
    pub async fn notify(&self, method: &str) -> Result<()> {
        self.send(&Request::notification(method, None)).await
    }

    pub async fn list_tools(&self) -> Result<Vec<ToolDefinition>> {
        let result = self.request("tools/list", json!({})).await?;
        let tools = result.get("tools").cloned().unwrap_or_else(|| json!([]));
        Ok(serde_json::from_value(tools)?)
    }

    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolResult> {
        let result = self
            .request("tools/call", json!({ "name": name, "arguments": arguments }))
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    pub async fn list_prompts(&self) -> Result<Value> {
        self.request("prompts/list", json!({})).await
    }

    pub async fn get_prompt(&self, name: &str, arguments: Value) -> Result<Value> {
        self.request("prompts/get", json!({ "name": name, "arguments": arguments }))
            .await
    }

    pub async fn list_resources(&self) -> Result<Value> {
        self.request("resources/list", json!({})).await
    }

    async fn send(&self, request: &Request) -> Result<()> {
        let line = serde_json::to_string(request)?;
        debug!("-> {}", line);

        let mut writer = self.writer.lock().await;
        let written = async {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await
        }
        .await;

        if let Err(e) = written {
            // Broken pipe: the server is gone
            self.reader_alive.store(false, Ordering::SeqCst);
            return Err(anyhow!("Failed to write to server: {}", e));
        }
        Ok(())
    }
}

/// Route response lines to their waiting requests until EOF.
async fn read_responses<R>(reader: R, pending: PendingMap, alive: Arc<AtomicBool>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                debug!("<- {}", line);
                match serde_json::from_str::<Response>(line) {
                    Ok(response) => {
                        if let RequestId::Number(id) = response.id {
                            if let Some(tx) = pending.lock().await.remove(&id) {
                                let _ = tx.send(response);
                            }
                        } else {
                            warn!("Response without usable id: {}", line);
                        }
                    }
                    Err(e) => warn!(?e, "Unparseable line from server"),
                }
            }
            Ok(None) => {
                debug!("Server closed stdout");
                break;
            }
            Err(e) => {
                warn!(?e, "Reading from server failed");
                break;
            }
        }
    }

    alive.store(false, Ordering::SeqCst);
    // Wake everyone still waiting
    pending.lock().await.clear();
}
