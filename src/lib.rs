//! # docstore-mcp
//!
//! MCP (Model Context Protocol) server for the Docstore hosted document database.
//!
//! This crate exposes a Docstore project as MCP tools for AI agents. Every
//! tool call becomes exactly one authenticated REST call, and every failure
//! comes back as a structured `{code, message, suggestion}` payload the agent
//! can act on.
//!
//! ## Features
//!
//! - **26 tools** covering documents, collections, schemas, version history, webhooks and vector search
//! - **Two transports**: newline-delimited JSON-RPC over stdio, or stateless HTTP on `POST /mcp`
//! - **Actionable errors**: per-operation status tables map API failures to stable error codes
//!
//! ## Usage
//!
//! The server is typically run as an executable and configured in AI tools like Claude Desktop:
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "docstore": {
//!       "command": "/path/to/docstore-mcp",
//!       "env": { "DOCSTORE_API_KEY": "sk_...", "DOCSTORE_PROJECT": "my-project" }
//!     }
//!   }
//! }
//! ```
//!
//! ## Library Usage
//!
//! For testing or embedding, you can use the library API:
//!
//! ```no_run
//! use std::sync::Arc;
//! use docstore_mcp::{Config, McpServer, ToolContext, ToolRegistry};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! let ctx = ToolContext::from_config(config)?;
//! let mut server = McpServer::new(Arc::new(ToolRegistry::new()), ctx);
//!
//! // Reads from stdin, writes to stdout
//! server.run_stdio().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod classify;
pub mod client;
pub mod config;
pub mod context;
pub mod convert;
mod error;
pub mod filter;
pub mod response;
mod server;
pub mod tools;
pub mod transport;

pub use client::{ApiError, ApiRequest, RestClient};
pub use config::{Config, ConfigError};
pub use context::ToolContext;
pub use error::{rpc_codes, McpError, Result};
pub use response::{ContentBlock, ToolResponse};
pub use server::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, McpServer, PROTOCOL_VERSION};
pub use tools::{ToolDef, ToolRegistry};
pub use transport::http::{router, serve, AppState};
pub use transport::session::{EphemeralSession, StatelessAdapter};
pub use transport::Transport;
