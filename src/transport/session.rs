//! Per-request MCP sessions for the HTTP transport.
//!
//! Each `POST /mcp` gets a fresh [`McpServer`] bound to a
//! [`StatelessAdapter`]. Nothing survives the request: no session ID is
//! issued and the pair is released when the request finishes or its future
//! is dropped because the client went away.

use std::sync::Arc;

use crate::context::ToolContext;
use crate::error::{McpError, Result};
use crate::server::{JsonRpcResponse, McpServer};
use crate::tools::ToolRegistry;

type Hook = Box<dyn FnOnce() + Send>;

/// Transport adapter that carries exactly one JSON-RPC exchange.
#[derive(Default)]
pub struct StatelessAdapter {
    hooks: Vec<Hook>,
    exchanged: bool,
    closed: bool,
}

impl StatelessAdapter {
    /// Create an adapter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stateless adapters never issue an `Mcp-Session-Id`.
    pub fn session_id(&self) -> Option<&str> {
        None
    }

    /// Whether [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Run `hook` when the adapter closes.
    pub fn on_close(&mut self, hook: impl FnOnce() + Send + 'static) {
        self.hooks.push(Box::new(hook));
    }

    /// Feed one raw request body through `server`.
    ///
    /// Returns `None` when the body was a notification.
    pub async fn exchange(
        &mut self,
        server: &mut McpServer,
        body: &[u8],
    ) -> Result<Option<JsonRpcResponse>> {
        if self.closed {
            return Err(McpError::SessionClosed);
        }
        if self.exchanged {
            return Err(McpError::Protocol(
                "stateless transport carries a single message".to_string(),
            ));
        }
        self.exchanged = true;

        match std::str::from_utf8(body) {
            Ok(raw) => Ok(server.handle_message(raw).await),
            Err(e) => Ok(Some(JsonRpcResponse::parse_error(e))),
        }
    }

    /// Close the adapter and run its hooks.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Err(McpError::SessionClosed);
        }
        self.closed = true;
        for hook in self.hooks.drain(..) {
            hook();
        }
        Ok(())
    }
}

/// A server and adapter pair living for one HTTP request.
pub struct EphemeralSession {
    server: McpServer,
    adapter: StatelessAdapter,
    released: bool,
}

impl EphemeralSession {
    /// Open a session over the shared registry.
    pub fn open(registry: Arc<ToolRegistry>, ctx: ToolContext) -> Self {
        tracing::debug!("ephemeral session opened");
        Self {
            server: McpServer::new(registry, ctx),
            adapter: StatelessAdapter::new(),
            released: false,
        }
    }

    /// Run `hook` once when the session is released.
    pub fn on_release(&mut self, hook: impl FnOnce() + Send + 'static) {
        self.adapter.on_close(hook);
    }

    /// Handle the request body.
    pub async fn exchange(&mut self, body: &[u8]) -> Result<Option<JsonRpcResponse>> {
        self.adapter.exchange(&mut self.server, body).await
    }

    /// Whether [`release`](Self::release) has run.
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Close the adapter, then the server. Runs at most once.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        tracing::debug!("ephemeral session released");

        if let Err(e) = self.adapter.close() {
            tracing::debug!(error = %e, "adapter close failed");
        }
        if let Err(e) = self.server.close() {
            tracing::debug!(error = %e, "server close failed");
        }
    }
}

impl Drop for EphemeralSession {
    fn drop(&mut self) {
        self.release();
    }
}
