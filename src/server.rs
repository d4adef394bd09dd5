//! MCP server implementation.
//!
//! Handles JSON-RPC 2.0 messages according to the MCP protocol specification.
//! The same server type backs the stdio loop and each HTTP request.

use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value as JsonValue};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::task::JoinSet;

use crate::context::ToolContext;
use crate::error::{rpc_codes, McpError, Result};
use crate::tools::ToolRegistry;

/// MCP protocol version we support.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Server information.
pub const SERVER_NAME: &str = "docstore-mcp";
/// Server version reported in `serverInfo`.
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

const INSTRUCTIONS: &str = "Tools for a hosted Docstore project. Documents live in collections; \
use docstore_collection_list to discover them. Failed calls return {\"error\": {code, message, suggestion}} \
with isError set; follow the suggestion before retrying.";

/// JSON-RPC 2.0 request.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version, must be "2.0".
    pub jsonrpc: String,
    /// Request ID. Absent for notifications; an explicit `null` is kept.
    #[serde(default, deserialize_with = "present")]
    pub id: Option<JsonValue>,
    /// Method name.
    pub method: String,
    /// Method parameters.
    #[serde(default)]
    pub params: Option<JsonValue>,
}

fn present<'de, D>(deserializer: D) -> std::result::Result<Option<JsonValue>, D::Error>
where
    D: Deserializer<'de>,
{
    JsonValue::deserialize(deserializer).map(Some)
}

impl JsonRpcRequest {
    /// Whether the sender expects no response.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Always "2.0".
    pub jsonrpc: String,
    /// ID of the request this answers; `null` when it could not be determined.
    pub id: Option<JsonValue>,
    /// Result on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,
    /// Error on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code (see [`rpc_codes`]).
    pub code: i32,
    /// Error message.
    pub message: String,
    /// Additional data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
}

impl JsonRpcResponse {
    /// Create a success response.
    pub fn success(id: Option<JsonValue>, result: JsonValue) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: Option<JsonValue>, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
                data: None,
            }),
        }
    }

    /// Create an error response from an McpError.
    pub fn from_error(id: Option<JsonValue>, err: McpError) -> Self {
        Self::error(id, err.rpc_code(), err.to_string())
    }

    /// Response to a message that is not valid JSON.
    pub fn parse_error(err: impl std::fmt::Display) -> Self {
        Self::error(None, rpc_codes::PARSE_ERROR, format!("Parse error: {}", err))
    }
}

/// MCP server.
pub struct McpServer {
    registry: Arc<ToolRegistry>,
    ctx: ToolContext,
    initialized: bool,
    closed: bool,
}

impl McpServer {
    /// Create a server dispatching to `registry` with the given context.
    pub fn new(registry: Arc<ToolRegistry>, ctx: ToolContext) -> Self {
        Self {
            registry,
            ctx,
            initialized: false,
            closed: false,
        }
    }

    /// Whether `initialize` has been received.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Close the server. Later messages are answered with an error.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Err(McpError::SessionClosed);
        }
        self.closed = true;
        tracing::debug!("mcp server closed");
        Ok(())
    }

    /// Run the server, reading from stdin and writing to stdout.
    pub async fn run_stdio(&mut self) -> Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.run(stdin, stdout).await
    }

    /// Serve newline-delimited JSON-RPC until the reader reaches EOF.
    ///
    /// Tool calls run concurrently and are answered in completion order.
    /// Everything else is answered before the next line is read.
    pub async fn run<R, W>(&mut self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();
        let mut in_flight: JoinSet<Option<JsonRpcResponse>> = JoinSet::new();

        loop {
            tokio::select! {
                read = reader.read_until(b'\n', &mut buf) => {
                    if read? == 0 {
                        // EOF - client disconnected
                        tracing::debug!("input closed, shutting down");
                        break;
                    }
                    let line = std::mem::take(&mut buf);
                    if let Some(response) = self.accept_line(&line, &mut in_flight).await {
                        write_response(&mut writer, &response).await?;
                    }
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Some(response) = settle(joined) {
                        write_response(&mut writer, &response).await?;
                    }
                }
            }
        }

        while let Some(joined) = in_flight.join_next().await {
            if let Some(response) = settle(joined) {
                write_response(&mut writer, &response).await?;
            }
        }

        Ok(())
    }

    async fn accept_line(
        &mut self,
        line: &[u8],
        in_flight: &mut JoinSet<Option<JsonRpcResponse>>,
    ) -> Option<JsonRpcResponse> {
        let text = match std::str::from_utf8(line) {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!(error = %e, "message is not valid UTF-8");
                return Some(JsonRpcResponse::parse_error(e));
            }
        };

        let message = text.trim();
        if message.is_empty() {
            return None;
        }

        let request = match parse_message(message) {
            Ok(request) => request,
            Err(response) => return Some(response),
        };

        if request.method == "tools/call" && request.jsonrpc == "2.0" && !self.closed {
            let registry = Arc::clone(&self.registry);
            let ctx = self.ctx.clone();
            in_flight.spawn(async move {
                let notification = request.is_notification();
                let response = call_tool(&registry, &ctx, request).await;
                (!notification).then_some(response)
            });
            return None;
        }

        self.handle_request(request).await
    }

    /// Handle one raw JSON-RPC message. Returns `None` for notifications.
    pub async fn handle_message(&mut self, raw: &str) -> Option<JsonRpcResponse> {
        match parse_message(raw) {
            Ok(request) => self.handle_request(request).await,
            Err(response) => Some(response),
        }
    }

    /// Handle a single JSON-RPC request. Returns `None` for notifications.
    pub async fn handle_request(&mut self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let notification = request.is_notification();
        let response = self.route(request).await;
        if notification {
            None
        } else {
            Some(response)
        }
    }

    async fn route(&mut self, request: JsonRpcRequest) -> JsonRpcResponse {
        // Validate JSON-RPC version
        if request.jsonrpc != "2.0" {
            return JsonRpcResponse::error(
                request.id,
                rpc_codes::INVALID_REQUEST,
                "Invalid JSON-RPC version".to_string(),
            );
        }

        if self.closed {
            return JsonRpcResponse::from_error(request.id, McpError::SessionClosed);
        }

        tracing::debug!(method = %request.method, "rpc request");

        // Route to appropriate handler
        match request.method.as_str() {
            "initialize" => self.handle_initialize(request),
            "initialized" | "notifications/initialized" | "notifications/cancelled" => {
                JsonRpcResponse::success(request.id, JsonValue::Null)
            }
            "tools/list" => self.handle_tools_list(request),
            "tools/call" => call_tool(&self.registry, &self.ctx, request).await,
            "ping" => JsonRpcResponse::success(request.id, json!({})),
            _ => JsonRpcResponse::error(
                request.id,
                rpc_codes::METHOD_NOT_FOUND,
                format!("Unknown method: {}", request.method),
            ),
        }
    }

    /// Handle the initialize request.
    fn handle_initialize(&mut self, request: JsonRpcRequest) -> JsonRpcResponse {
        self.initialized = true;

        JsonRpcResponse::success(
            request.id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": SERVER_VERSION
                },
                "instructions": INSTRUCTIONS
            }),
        )
    }

    /// Handle the tools/list request.
    fn handle_tools_list(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        JsonRpcResponse::success(request.id, json!({ "tools": self.registry.tools() }))
    }
}

fn parse_message(raw: &str) -> std::result::Result<JsonRpcRequest, JsonRpcResponse> {
    let value: JsonValue = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(error = %e, "unparseable message");
            return Err(JsonRpcResponse::parse_error(e));
        }
    };

    serde_json::from_value::<JsonRpcRequest>(value.clone()).map_err(|e| {
        JsonRpcResponse::error(
            value.get("id").cloned().filter(|id| !id.is_null()),
            rpc_codes::INVALID_REQUEST,
            format!("Invalid request: {}", e),
        )
    })
}

/// Handle the tools/call request.
async fn call_tool(
    registry: &ToolRegistry,
    ctx: &ToolContext,
    request: JsonRpcRequest,
) -> JsonRpcResponse {
    // Extract name and arguments from params
    let params = match &request.params {
        Some(JsonValue::Object(obj)) => obj,
        _ => {
            return JsonRpcResponse::error(
                request.id,
                rpc_codes::INVALID_PARAMS,
                "Missing params object".to_string(),
            )
        }
    };

    let name = match params.get("name").and_then(|v| v.as_str()) {
        Some(n) => n.to_string(),
        None => {
            return JsonRpcResponse::error(
                request.id,
                rpc_codes::INVALID_PARAMS,
                "Missing 'name' in params".to_string(),
            )
        }
    };

    let arguments = match params.get("arguments") {
        Some(JsonValue::Object(obj)) => obj.clone(),
        Some(JsonValue::Null) | None => Map::new(),
        _ => {
            return JsonRpcResponse::error(
                request.id,
                rpc_codes::INVALID_PARAMS,
                "'arguments' must be an object".to_string(),
            )
        }
    };

    match registry.dispatch(ctx, &name, arguments).await {
        Ok(response) => JsonRpcResponse::success(request.id, response.to_json()),
        Err(err) => JsonRpcResponse::from_error(request.id, err),
    }
}

fn settle(
    joined: std::result::Result<Option<JsonRpcResponse>, tokio::task::JoinError>,
) -> Option<JsonRpcResponse> {
    match joined {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "tool call task failed");
            None
        }
    }
}

async fn write_response<W>(writer: &mut W, response: &JsonRpcResponse) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let response_json = serde_json::to_string(response)?;
    writer.write_all(response_json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
